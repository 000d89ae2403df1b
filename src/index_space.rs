use core::ops::Range;
use std::fmt;
use serde::{Deserialize, Serialize};




#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]


/**
 * Represents a rectangular region in a discrete index space. Both ranges
 * are half-open, so the cells of a box `ilo..=ihi, jlo..=jhi` are stored as
 * `ilo..ihi + 1, jlo..jhi + 1`.
 */
pub struct IndexSpace {
    di: Range<i64>,
    dj: Range<i64>,
}




// ============================================================================
impl IndexSpace {


    pub fn new(di: Range<i64>, dj: Range<i64>) -> Self {

        assert!(
            di.start <= di.end && dj.start <= dj.end,
            "index space has negative volume");

        Self { di, dj }
    }


    /**
     * Return the number of indexes on each axis.
     */
    pub fn dim(&self) -> (usize, usize) {
        ((self.di.end - self.di.start) as usize,
         (self.dj.end - self.dj.start) as usize)
    }


    /**
     * Return the number of elements in this index space.
     */
    pub fn len(&self) -> usize {
        let (l, m) = self.dim();
        l * m
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> (i64, i64) {
        (self.di.start, self.dj.start)
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> (i64, i64) {
        (self.di.end, self.dj.end)
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: (i64, i64)) -> bool {
        self.di.contains(&index.0) && self.dj.contains(&index.1)
    }


    /**
     * Determine whether another index space is a subset of this one.
     */
    pub fn contains_space(&self, other: &Self) -> bool {
        other.di.start >= self.di.start && other.di.end <= self.di.end &&
        other.dj.start >= self.dj.start && other.dj.end <= self.dj.end
    }


    /**
     * Return the common part of two index spaces, if they share any index.
     * Boxes that only touch along an edge do not intersect.
     */
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let i0 = self.di.start.max(other.di.start);
        let i1 = self.di.end.min(other.di.end);
        let j0 = self.dj.start.max(other.dj.start);
        let j1 = self.dj.end.min(other.dj.end);

        if i0 < i1 && j0 < j1 {
            Some(Self::new(i0..i1, j0..j1))
        } else {
            None
        }
    }


    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }


    /**
     * Expand this index space by the given number of elements on each axis.
     */
    pub fn extend_all(&self, delta: i64) -> Self {
        Self::new(
            self.di.start - delta .. self.di.end + delta,
            self.dj.start - delta .. self.dj.end + delta)
    }


    /**
     * Map this index space onto a finer level, where each index becomes a
     * block of `rx` by `ry` indexes.
     */
    pub fn refine(&self, rx: i64, ry: i64) -> Self {
        Self::new(
            self.di.start * rx .. self.di.end * rx,
            self.dj.start * ry .. self.dj.end * ry)
    }


    /**
     * Return the linear offset for the given index, in a row-major memory
     * buffer aligned with the start of this index space.
     */
    pub fn row_major_offset(&self, index: (i64, i64)) -> usize {
        let i = (index.0 - self.di.start) as usize;
        let j = (index.1 - self.dj.start) as usize;
        let m = (self.dj.end - self.dj.start) as usize;
        i * m + j
    }


    /**
     * Return an iterator which traverses the index space in row-major order
     * (C-like; the final index increases fastest).
     */
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.di.clone().flat_map(move |i| self.dj.clone().map(move |j| (i, j)))
    }
}




// ============================================================================
impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}, {}..{}]", self.di.start, self.di.end, self.dj.start, self.dj.end)
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range2d(di: Range<i64>, dj: Range<i64>) -> IndexSpace {
    IndexSpace::new(di, dj)
}
