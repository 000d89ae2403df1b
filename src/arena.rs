//! A single contiguous workspace buffer, shared by the solution and
//! auxiliary arrays of every grid in the hierarchy.
//!
//! Blocks are handed out first-fit from an offset-ordered free list and are
//! merged with their free neighbours on release. There is no compaction, so
//! the capacity must cover the worst-case concurrent footprint of all levels.

use std::collections::{BTreeMap, HashMap};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};




/// An opaque `(offset, length)` reference to a live block of the arena.
/// Handles are created by [`Arena::acquire`] and are invalid after being
/// passed to [`Arena::release`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    offset: usize,
    len: usize,
}

impl Handle {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}




/// A snapshot of arena occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    pub capacity: usize,
    pub in_use: usize,
    pub free: usize,
    pub largest_free: usize,
    pub high_water: usize,
    pub live: usize,
}




/// The workspace buffer and its allocation bookkeeping.
pub struct Arena {
    data: Vec<f64>,
    free: BTreeMap<usize, usize>,
    live: HashMap<usize, usize>,
    in_use: usize,
    high_water: usize,
}




// ============================================================================
impl Arena {

    /// Create an arena of `capacity` zero-initialized cells, all free.
    pub fn new(capacity: usize) -> Self {
        let mut free = BTreeMap::new();

        if capacity > 0 {
            free.insert(0, capacity);
        }
        Self {
            data: vec![0.0; capacity],
            free,
            live: HashMap::new(),
            in_use: 0,
            high_water: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total number of unallocated cells, whether or not they are
    /// contiguous.
    pub fn free_space(&self) -> usize {
        self.capacity() - self.in_use
    }

    pub fn largest_free(&self) -> usize {
        self.free.values().copied().max().unwrap_or(0)
    }

    /// Iterate over the free ranges as `(offset, len)` in offset order.
    pub fn free_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.free.iter().map(|(&o, &l)| (o, l))
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.live.get(&handle.offset) == Some(&handle.len)
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity(),
            in_use: self.in_use,
            free: self.free_space(),
            largest_free: self.largest_free(),
            high_water: self.high_water,
            live: self.live.len(),
        }
    }

    /// Acquire a zero-filled block of `len` contiguous cells from the first
    /// free range large enough to hold it.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn acquire(&mut self, len: usize) -> Result<Handle> {
        assert!(len > 0, "arena blocks must have a positive length");

        let found = self.free
            .iter()
            .find(|(_, &l)| l >= len)
            .map(|(&o, &l)| (o, l));

        let (offset, available) = match found {
            Some(block) => block,
            None => {
                if self.free_space() >= len {
                    warn!("arena fragmented: {} cells free but no block of {}", self.free_space(), len);
                }
                return Err(Error::OutOfSpace {
                    requested: len,
                    largest_free: self.largest_free(),
                    free: self.free_space(),
                })
            }
        };

        self.free.remove(&offset);

        if available > len {
            self.free.insert(offset + len, available - len);
        }
        self.live.insert(offset, len);
        self.in_use += len;
        self.high_water = self.high_water.max(offset + len);
        self.data[offset..offset + len].iter_mut().for_each(|x| *x = 0.0);

        debug!("arena acquire {} cells at {} ({} free)", len, offset, self.free_space());
        Ok(Handle { offset, len })
    }

    /// Return a block to the free list, merging it with free neighbours on
    /// both sides. The handle must be live and carry the length it was
    /// acquired with.
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        let Handle { offset, len } = handle;

        if !self.is_live(handle) {
            return Err(Error::InvalidHandle { offset, len })
        }
        self.live.remove(&offset);
        self.in_use -= len;

        let mut start = offset;
        let mut end = offset + len;

        let below = self.free.range(..offset).next_back().map(|(&o, &l)| (o, l));

        if let Some((o, l)) = below {
            if o + l == start {
                self.free.remove(&o);
                start = o;
            }
        }
        if let Some(l) = self.free.remove(&end) {
            end += l;
        }
        self.free.insert(start, end - start);

        debug!("arena release {} cells at {} ({} free)", len, offset, self.free_space());
        Ok(())
    }

    pub fn slice(&self, handle: Handle) -> &[f64] {
        debug_assert!(self.is_live(handle), "read through a released handle");
        &self.data[handle.range()]
    }

    pub fn slice_mut(&mut self, handle: Handle) -> &mut [f64] {
        debug_assert!(self.is_live(handle), "write through a released handle");
        &mut self.data[handle.range()]
    }

    /// Borrow two distinct live blocks mutably at the same time.
    ///
    /// # Panics
    ///
    /// Panics if the two handles refer to the same block.
    pub fn pair_mut(&mut self, a: Handle, b: Handle) -> (&mut [f64], &mut [f64]) {
        assert!(a.offset != b.offset, "pair_mut needs two distinct blocks");
        debug_assert!(self.is_live(a) && self.is_live(b));

        if a.offset < b.offset {
            let (lo, hi) = self.data.split_at_mut(b.offset);
            (&mut lo[a.range()], &mut hi[..b.len])
        } else {
            let (lo, hi) = self.data.split_at_mut(a.offset);
            (&mut hi[..a.len], &mut lo[b.range()])
        }
    }
}
