use crate::error::{Error, Result};
use crate::hierarchy::GridHierarchy;
use crate::index_space::IndexSpace;




#[derive(Clone, Copy, Debug, PartialEq, Eq)]

/**
 * State of one cell of a domain mask.
 */
pub enum MaskCell {
    Outside,
    Inside,
    Flagged,
}

impl MaskCell {
    pub fn is_occupied(self) -> bool {
        !matches!(self, MaskCell::Outside)
    }
}




#[derive(Clone, Debug, PartialEq)]

/**
 * A flag per cell over a rectangle of one level's index space. Indexes
 * outside the rectangle read as `Outside`.
 */
pub struct DomainMask {
    space: IndexSpace,
    cells: Vec<MaskCell>,
}




// ============================================================================
impl DomainMask {

    pub fn new(space: IndexSpace, fill: MaskCell) -> Self {
        Self { cells: vec![fill; space.len()], space }
    }

    /**
     * Build the mask of cells covered by the interiors of the grids at
     * `level`, over the whole extents of that level.
     */
    pub fn from_level(hierarchy: &GridHierarchy, level: usize) -> Result<Self> {
        hierarchy.check_level(level)?;

        let mut mask = Self::new(hierarchy.level_extents(level), MaskCell::Outside);

        for grid in hierarchy.iter_level(level) {
            for index in grid.interior().iter() {
                mask.set(index, MaskCell::Inside)
            }
        }
        Ok(mask)
    }

    pub fn space(&self) -> &IndexSpace {
        &self.space
    }

    pub fn get(&self, index: (i64, i64)) -> MaskCell {
        if self.space.contains(index) {
            self.cells[self.space.row_major_offset(index)]
        } else {
            MaskCell::Outside
        }
    }

    /**
     * Set the state of a cell inside the mask rectangle.
     *
     * # Panics
     *
     * Panics if the index lies outside the mask rectangle.
     */
    pub fn set(&mut self, index: (i64, i64), cell: MaskCell) {
        assert!(self.space.contains(index), "index {:?} outside mask {}", index, self.space);
        let n = self.space.row_major_offset(index);
        self.cells[n] = cell;
    }

    pub fn is_occupied(&self, index: (i64, i64)) -> bool {
        self.get(index).is_occupied()
    }

    pub fn count(&self, cell: MaskCell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_occupied()).count()
    }

    /**
     * Iterate over `(index, state)` pairs in row-major order.
     */
    pub fn iter(&self) -> impl Iterator<Item = ((i64, i64), MaskCell)> + '_ {
        self.space.iter().zip(self.cells.iter().copied())
    }

    /**
     * Return a copy of this mask where every occupied cell that touches an
     * unoccupied cell (including across a corner, or past the edge of the
     * rectangle) has become `Outside`.
     */
    pub fn eroded(&self) -> Self {
        let mut result = self.clone();

        for (index, cell) in self.iter() {
            if cell.is_occupied() && !self.ring_occupied(index) {
                result.set(index, MaskCell::Outside)
            }
        }
        result
    }

    fn ring_occupied(&self, (i, j): (i64, i64)) -> bool {
        (-1..=1).all(|di| (-1..=1).all(|dj| self.is_occupied((i + di, j + dj))))
    }

    /**
     * Upsample this mask onto a level finer by `rx` and `ry`: each cell is
     * replicated into an `rx` by `ry` block.
     */
    pub fn refined(&self, rx: i64, ry: i64) -> Self {
        let space = self.space.refine(rx, ry);
        let cells = space
            .iter()
            .map(|(i, j)| self.get((i.div_euclid(rx), j.div_euclid(ry))))
            .collect();
        Self { space, cells }
    }

    /**
     * Copy this mask onto another rectangle of the same level. Cells of the
     * new rectangle not covered by this mask are `Outside`.
     */
    pub fn restricted_to(&self, space: &IndexSpace) -> Self {
        let cells = space.iter().map(|index| self.get(index)).collect();
        Self { space: space.clone(), cells }
    }

    /**
     * Determine whether every occupied cell of this mask lies over an
     * occupied cell of `coarse`, which is `rx` by `ry` times coarser.
     */
    pub fn is_nested_in(&self, coarse: &Self, rx: i64, ry: i64) -> bool {
        self.iter()
            .filter(|(_, c)| c.is_occupied())
            .all(|((i, j), _)| coarse.is_occupied((i.div_euclid(rx), j.div_euclid(ry))))
    }
}




/**
 * Derive the mask of cells at level `lcheck` eligible to be flagged. The
 * occupied domain of level `base` is projected up one level at a time: at
 * each step the mask is eroded by one cell and then refined by that level's
 * ratios. A last erosion is applied at `lcheck`, so a flagged cell always
 * has at least one ring of coarser cells around it. When `base == lcheck`
 * the result is the eroded base domain.
 */
pub fn project_domain(hierarchy: &GridHierarchy, base: usize, lcheck: usize) -> Result<DomainMask> {
    hierarchy.check_level(lcheck)?;

    if base > lcheck {
        return Err(Error::InvalidLevel { level: base, max_levels: lcheck })
    }
    let mut mask = DomainMask::from_level(hierarchy, base)?;

    for level in base..lcheck {
        let (rx, ry) = hierarchy.config().ratio(level);
        let coarse = mask.eroded();
        mask = coarse.refined(rx, ry);
        debug_assert!(mask.is_nested_in(&coarse, rx, ry));
    }
    Ok(mask.eroded().restricted_to(&hierarchy.level_extents(lcheck)))
}
