//! The grid hierarchy manager: the workspace arena, the fixed-capacity grid
//! descriptor table, and one singly linked list of grids per level.
//!
//! Structural changes (creating or destroying grids) take `&mut self`, and
//! traversals borrow the hierarchy immutably, so a level list can never be
//! mutated while it is being walked. Read-only traversals may run in
//! parallel across the grids of a level with [`GridHierarchy::par_map_level`].

use log::debug;
use rayon::prelude::*;
use crate::arena::{Arena, ArenaStats, Handle};
use crate::config::HierarchyConfig;
use crate::error::{Error, Result};
use crate::grid::{GridId, GridRecord, GridView, GridViewMut};
use crate::index_space::{range2d, IndexSpace};




struct Slot {
    generation: u32,
    record: Option<GridRecord>,
}




#[derive(Clone, Copy, Default)]
struct LevelList {
    head: Option<GridId>,
    tail: Option<GridId>,
    len: usize,
}




/// Owner of every grid in a run, and of the memory backing their data.
pub struct GridHierarchy {
    config: HierarchyConfig,
    arena: Arena,
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    levels: Vec<LevelList>,
}




// ============================================================================
impl GridHierarchy {

    /// Create an empty hierarchy with an arena of `config.arena_capacity`
    /// cells.
    pub fn new(config: HierarchyConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            arena: Arena::new(config.arena_capacity),
            slots: Vec::new(),
            vacant: Vec::new(),
            levels: vec![LevelList::default(); config.max_levels],
            config,
        })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    pub fn max_levels(&self) -> usize {
        self.config.max_levels
    }

    pub fn check_level(&self, level: usize) -> Result<()> {
        if level >= 1 && level <= self.config.max_levels {
            Ok(())
        } else {
            Err(Error::InvalidLevel { level, max_levels: self.config.max_levels })
        }
    }

    fn assert_level(&self, level: usize) {
        assert!(level >= 1 && level <= self.config.max_levels,
            "level {} is outside 1..={}", level, self.config.max_levels);
    }

    /// Return the index space covering the whole physical domain at the
    /// resolution of `level`. This and the other geometry accessors take a
    /// level already validated with [`GridHierarchy::check_level`].
    ///
    /// # Panics
    ///
    /// Panics if `level` is zero or above `max_levels`.
    pub fn level_extents(&self, level: usize) -> IndexSpace {
        self.assert_level(level);
        let (ax, ay) = self.config.total_ratio(level);
        range2d(0..self.config.mx * ax, 0..self.config.my * ay)
    }

    /// Return the cell spacing `(hx, hy)` of `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is zero or above `max_levels`.
    pub fn cell_size(&self, level: usize) -> (f64, f64) {
        self.assert_level(level);
        let (ax, ay) = self.config.total_ratio(level);
        let c = &self.config;
        ((c.upper.0 - c.lower.0) / (c.mx * ax) as f64,
         (c.upper.1 - c.lower.1) / (c.my * ay) as f64)
    }

    /// Return the physical coordinates of the center of a cell at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is zero or above `max_levels`.
    pub fn cell_center(&self, level: usize, index: (i64, i64)) -> (f64, f64) {
        let (hx, hy) = self.cell_size(level);
        (self.config.lower.0 + (index.0 as f64 + 0.5) * hx,
         self.config.lower.1 + (index.1 as f64 + 0.5) * hy)
    }

    pub fn num_grids(&self, level: usize) -> usize {
        self.levels.get(level.wrapping_sub(1)).map_or(0, |l| l.len)
    }

    pub fn total_grids(&self) -> usize {
        self.levels.iter().map(|l| l.len).sum()
    }

    /// Return the finest level holding at least one grid, or zero for an
    /// empty hierarchy.
    pub fn finest_level(&self) -> usize {
        self.levels.iter().rposition(|l| l.len > 0).map_or(0, |n| n + 1)
    }




    // ========================================================================
    fn record(&self, id: GridId) -> Option<&GridRecord> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.record.as_ref())
    }

    fn record_mut(&mut self, id: GridId) -> Option<&mut GridRecord> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.record.as_mut())
    }

    fn claim_slot(&mut self) -> Result<GridId> {
        if let Some(slot) = self.vacant.pop() {
            let generation = self.slots[slot as usize].generation;
            Ok(GridId { slot, generation })
        } else if self.slots.len() < self.config.max_grids {
            self.slots.push(Slot { generation: 0, record: None });
            Ok(GridId { slot: self.slots.len() as u32 - 1, generation: 0 })
        } else {
            Err(Error::TableFull { capacity: self.config.max_grids })
        }
    }

    fn unclaim_slot(&mut self, id: GridId) {
        let slot = &mut self.slots[id.slot as usize];
        slot.record = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(id.slot);
    }




    // ========================================================================
    pub fn grid(&self, id: GridId) -> Result<&GridRecord> {
        self.record(id).ok_or(Error::NotFound(id))
    }

    pub fn contains(&self, id: GridId) -> bool {
        self.record(id).is_some()
    }

    /// Create a grid covering `bbox` at `level`, with solution and auxiliary
    /// arrays acquired from the arena, and append it to the level list. The
    /// box must lie inside the level's extents and must not overlap any
    /// other grid at the same level.
    pub fn create_grid(&mut self, level: usize, bbox: IndexSpace) -> Result<GridId> {
        self.check_level(level)?;

        if bbox.is_empty() || !self.level_extents(level).contains_space(&bbox) {
            return Err(Error::OutsideDomain { level, bbox })
        }
        if let Some(existing) = self.iter_level(level).find(|g| g.interior.overlaps(&bbox)) {
            return Err(Error::Overlap { level, existing: existing.id })
        }

        let ghost_width = self.config.ghost_width;
        let nvar = self.config.nvar;
        let naux = self.config.naux;
        let id = self.claim_slot()?;

        let solution = match self.arena.acquire(GridRecord::storage_len(&bbox, ghost_width, nvar)) {
            Ok(handle) => handle,
            Err(e) => {
                self.vacant.push(id.slot);
                return Err(e)
            }
        };
        let aux = if naux > 0 {
            match self.arena.acquire(GridRecord::storage_len(&bbox, ghost_width, naux)) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    self.arena.release(solution)?;
                    self.vacant.push(id.slot);
                    return Err(e)
                }
            }
        } else {
            None
        };

        debug!("create grid {} at level {} over {}", id, level, bbox);

        self.slots[id.slot as usize].record = Some(GridRecord {
            id,
            level,
            interior: bbox,
            ghost_width,
            nvar,
            naux,
            solution,
            aux,
            next: None,
        });

        let list = self.levels[level - 1];

        if let Some(tail) = list.tail {
            if let Some(last) = self.record_mut(tail) {
                last.next = Some(id);
            }
        }
        let list = &mut self.levels[level - 1];
        list.head = list.head.or(Some(id));
        list.tail = Some(id);
        list.len += 1;

        Ok(id)
    }

    /// Unlink a grid from its level list and release its arena blocks.
    pub fn destroy_grid(&mut self, id: GridId) -> Result<()> {
        let (level, next, solution, aux) = {
            let g = self.grid(id)?;
            (g.level, g.next, g.solution, g.aux)
        };

        let mut prev: Option<GridId> = None;
        let mut cursor = self.levels[level - 1].head;

        while let Some(c) = cursor {
            if c == id {
                break
            }
            prev = cursor;
            cursor = self.record(c).and_then(|g| g.next);
        }
        if cursor.is_none() {
            return Err(Error::NotFound(id))
        }

        match prev {
            Some(p) => self.record_mut(p).ok_or(Error::NotFound(p))?.next = next,
            None => self.levels[level - 1].head = next,
        }
        let list = &mut self.levels[level - 1];

        if list.tail == Some(id) {
            list.tail = prev;
        }
        list.len -= 1;

        self.unclaim_slot(id);
        self.arena.release(solution)?;

        if let Some(aux) = aux {
            self.arena.release(aux)?;
        }
        debug!("destroy grid {} at level {}", id, level);
        Ok(())
    }

    /// Destroy every grid at `level` and create one grid per box in its
    /// place. Old grids are released before the new ones are acquired, so
    /// their arena space is available for reuse.
    pub fn replace_level<I>(&mut self, level: usize, boxes: I) -> Result<Vec<GridId>>
    where
        I: IntoIterator<Item = IndexSpace>
    {
        self.check_level(level)?;

        for id in self.grid_ids(level) {
            self.destroy_grid(id)?;
        }
        boxes.into_iter().map(|bbox| self.create_grid(level, bbox)).collect()
    }

    /// Destroy every grid at `level` and at all finer levels.
    pub fn clear_levels_from(&mut self, level: usize) -> Result<()> {
        for l in level.max(1)..=self.config.max_levels {
            for id in self.grid_ids(l) {
                self.destroy_grid(id)?;
            }
        }
        Ok(())
    }




    // ========================================================================
    /// Iterate over the records of a level, in list (insertion) order.
    pub fn iter_level(&self, level: usize) -> LevelIter<'_> {
        LevelIter {
            hierarchy: self,
            cursor: self.levels.get(level.wrapping_sub(1)).and_then(|l| l.head),
        }
    }

    pub fn grid_ids(&self, level: usize) -> Vec<GridId> {
        self.iter_level(level).map(|g| g.id).collect()
    }

    pub fn view(&self, id: GridId) -> Result<GridView<'_>> {
        let record = self.grid(id)?;
        Ok(self.view_of(record))
    }

    fn view_of<'a>(&'a self, record: &'a GridRecord) -> GridView<'a> {
        GridView {
            record,
            solution: self.arena.slice(record.solution),
            aux: record.aux.map(|h: Handle| self.arena.slice(h)),
        }
    }

    pub fn view_mut(&mut self, id: GridId) -> Result<GridViewMut<'_>> {
        let record = self
            .slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.record.as_ref())
            .ok_or(Error::NotFound(id))?;

        let (solution, aux) = match record.aux {
            Some(aux) => {
                let (q, a) = self.arena.pair_mut(record.solution, aux);
                (q, Some(a))
            }
            None => (self.arena.slice_mut(record.solution), None),
        };
        Ok(GridViewMut { record, solution, aux })
    }

    /// Invoke `visitor` on every grid of `level`, in list order.
    pub fn for_each_grid<F>(&self, level: usize, mut visitor: F)
    where
        F: FnMut(GridView<'_>)
    {
        for record in self.iter_level(level) {
            visitor(self.view_of(record))
        }
    }

    /// Map `f` over the grids of `level` on the Rayon thread pool. Results
    /// are returned in list order.
    pub fn par_map_level<T, F>(&self, level: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(GridView<'_>) -> T + Sync + Send,
    {
        let views: Vec<_> = self.iter_level(level).map(|g| self.view_of(g)).collect();
        views.into_par_iter().map(f).collect()
    }
}




/// Iterator following the `next` links of one level list.
pub struct LevelIter<'a> {
    hierarchy: &'a GridHierarchy,
    cursor: Option<GridId>,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = &'a GridRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.hierarchy.record(self.cursor?)?;
        self.cursor = record.next;
        Some(record)
    }
}
