use std::fmt;
use serde::{Deserialize, Serialize};
use crate::arena::Handle;
use crate::index_space::IndexSpace;




/**
 * Identifier of a grid record: a slot in the descriptor table plus the
 * generation of that slot. A slot is reused after its grid is destroyed, but
 * with a new generation, so ids held across a destroy are detected as stale.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}




/**
 * One rectangular patch at a refinement level. The solution array holds
 * `nvar` values per cell over the interior box extended by the ghost width,
 * laid out row-major with the field index fastest. The auxiliary array has
 * the same layout with `naux` values per cell.
 */
#[derive(Clone, Debug)]
pub struct GridRecord {
    pub(crate) id: GridId,
    pub(crate) level: usize,
    pub(crate) interior: IndexSpace,
    pub(crate) ghost_width: i64,
    pub(crate) nvar: usize,
    pub(crate) naux: usize,
    pub(crate) solution: Handle,
    pub(crate) aux: Option<Handle>,
    pub(crate) next: Option<GridId>,
}




// ============================================================================
impl GridRecord {

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /**
     * Return the box of cells owned by this grid, excluding ghost cells.
     */
    pub fn interior(&self) -> &IndexSpace {
        &self.interior
    }

    /**
     * Return the box of cells stored for this grid, including ghost cells.
     */
    pub fn extended(&self) -> IndexSpace {
        self.interior.extend_all(self.ghost_width)
    }

    pub fn ghost_width(&self) -> i64 {
        self.ghost_width
    }

    pub fn nvar(&self) -> usize {
        self.nvar
    }

    pub fn naux(&self) -> usize {
        self.naux
    }

    pub fn solution_handle(&self) -> Handle {
        self.solution
    }

    pub fn aux_handle(&self) -> Option<Handle> {
        self.aux
    }

    /**
     * Return the grid that follows this one in its level list.
     */
    pub fn next(&self) -> Option<GridId> {
        self.next
    }

    /**
     * Return the position of the first value of cell `index` within an
     * array with `chunk` values per cell.
     *
     * # Panics
     *
     * Panics if `index` lies outside the interior extended by the ghost
     * width.
     */
    pub fn cell_offset(&self, index: (i64, i64), chunk: usize) -> usize {
        let extended = self.extended();
        assert!(extended.contains(index), "cell {:?} outside stored cells {} of grid {}", index, extended, self.id);
        extended.row_major_offset(index) * chunk
    }

    /**
     * Return the number of workspace cells needed for an array of this shape
     * with `chunk` values per cell.
     */
    pub fn storage_len(interior: &IndexSpace, ghost_width: i64, chunk: usize) -> usize {
        interior.extend_all(ghost_width).len() * chunk
    }
}




/**
 * Read-only view of one grid's record and data, handed to traversal
 * visitors. Cell accessors take indexes in the level's index space and
 * accept ghost cells; they panic on an index past the ghost ring.
 */
#[derive(Clone, Copy)]
pub struct GridView<'a> {
    pub record: &'a GridRecord,
    pub solution: &'a [f64],
    pub aux: Option<&'a [f64]>,
}




// ============================================================================
impl<'a> GridView<'a> {

    pub fn q(&self, index: (i64, i64)) -> &'a [f64] {
        let n = self.record.nvar;
        let s = self.record.cell_offset(index, n);
        &self.solution[s..s + n]
    }

    pub fn aux(&self, index: (i64, i64)) -> Option<&'a [f64]> {
        let n = self.record.naux;
        let s = self.record.cell_offset(index, n);
        self.aux.map(|aux| &aux[s..s + n])
    }
}




/**
 * Mutable view of one grid's data, used to fill solution and auxiliary
 * arrays.
 */
pub struct GridViewMut<'a> {
    pub record: &'a GridRecord,
    pub solution: &'a mut [f64],
    pub aux: Option<&'a mut [f64]>,
}




// ============================================================================
impl<'a> GridViewMut<'a> {

    pub fn q_mut(&mut self, index: (i64, i64)) -> &mut [f64] {
        let n = self.record.nvar;
        let s = self.record.cell_offset(index, n);
        &mut self.solution[s..s + n]
    }

    pub fn aux_mut(&mut self, index: (i64, i64)) -> Option<&mut [f64]> {
        let n = self.record.naux;
        let s = self.record.cell_offset(index, n);
        self.aux.as_mut().map(|aux| &mut aux[s..s + n])
    }

    /**
     * Set every stored cell (ghost cells included) from a closure taking the
     * cell index, the solution values and the auxiliary values.
     */
    pub fn fill<F>(&mut self, f: F)
    where
        F: Fn((i64, i64), &mut [f64], &mut [f64])
    {
        let extended = self.record.extended();
        let nvar = self.record.nvar;
        let naux = self.record.naux;
        let mut none: [f64; 0] = [];

        for (n, index) in extended.iter().enumerate() {
            let q = &mut self.solution[n * nvar..(n + 1) * nvar];
            match self.aux.as_mut() {
                Some(aux) => f(index, q, &mut aux[n * naux..(n + 1) * naux]),
                None => f(index, q, &mut none),
            }
        }
    }
}
