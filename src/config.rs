use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * A rectangle of the physical domain, active between times `t1` and `t2`,
 * which bounds the refinement level of the cells it contains. Cells inside
 * an active region are always refined to at least `min_level`, and are
 * never refined past `max_level`.
 */
pub struct Region {
    pub min_level: usize,
    pub max_level: usize,
    pub t1: f64,
    pub t2: f64,
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}




// ============================================================================
impl Region {

    pub fn is_active(&self, time: f64) -> bool {
        self.t1 <= time && time <= self.t2
    }

    pub fn contains(&self, point: (f64, f64)) -> bool {
        self.x1 <= point.0 && point.0 <= self.x2 && self.y1 <= point.1 && point.1 <= self.y2
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]

/**
 * Run-time parameters of a grid hierarchy. Level 1 is the coarsest level and
 * has `mx` by `my` cells covering `lower..upper`. Level `L + 1` refines level
 * `L` by `ratios_x[L - 1]` and `ratios_y[L - 1]`.
 */
pub struct HierarchyConfig {
    pub mx: i64,
    pub my: i64,
    pub lower: (f64, f64),
    pub upper: (f64, f64),
    pub ghost_width: i64,
    pub nvar: usize,
    pub naux: usize,

    /// Index into the auxiliary array of the capacity (cell volume) factor.
    pub capacity_index: Option<usize>,

    pub max_levels: usize,
    pub ratios_x: Vec<i64>,
    pub ratios_y: Vec<i64>,

    /// Number of `f64` cells in the shared workspace buffer.
    pub arena_capacity: usize,

    /// Maximum number of live grid records.
    pub max_grids: usize,

    /// Width of the ring of extra flags added around each flagged cell.
    pub buffer_width: i64,

    /// Minimum fraction of flagged cells in a box built by the clusterer.
    pub cutoff: f64,

    pub regions: Vec<Region>,

    /// Conservation reports are logged for levels up to this one.
    pub verbosity: usize,
}




// ============================================================================
impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            mx: 32,
            my: 32,
            lower: (0.0, 0.0),
            upper: (1.0, 1.0),
            ghost_width: 2,
            nvar: 3,
            naux: 3,
            capacity_index: None,
            max_levels: 3,
            ratios_x: vec![4, 4],
            ratios_y: vec![4, 4],
            arena_capacity: 1 << 22,
            max_grids: 4096,
            buffer_width: 3,
            cutoff: 0.7,
            regions: Vec::new(),
            verbosity: 1,
        }
    }
}




// ============================================================================
impl HierarchyConfig {

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidConfig(msg));

        if self.mx <= 0 || self.my <= 0 {
            return fail(format!("coarse grid must have cells, got {} x {}", self.mx, self.my))
        }
        if !(self.upper.0 > self.lower.0 && self.upper.1 > self.lower.1) {
            return fail("upper corner must lie above and right of lower corner".into())
        }
        if self.ghost_width < 1 {
            return fail(format!("ghost width {} leaves no neighbour cells at grid edges", self.ghost_width))
        }
        if self.nvar == 0 {
            return fail("nvar must be at least 1".into())
        }
        if self.max_levels == 0 {
            return fail("max_levels must be at least 1".into())
        }
        let needed = self.max_levels - 1;

        if self.ratios_x.len() < needed || self.ratios_y.len() < needed {
            return fail(format!("{} levels need {} refinement ratios per axis", self.max_levels, needed))
        }
        if let Some(r) = self.ratios_x[..needed].iter().chain(&self.ratios_y[..needed]).find(|&&r| r < 2) {
            return fail(format!("refinement ratio {} is less than 2", r))
        }
        if let Some(m) = self.capacity_index {
            if m >= self.naux {
                return fail(format!("capacity index {} needs naux > {}, got {}", m, m, self.naux))
            }
        }
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return fail(format!("cutoff {} is outside (0, 1]", self.cutoff))
        }
        if self.buffer_width < 0 {
            return fail(format!("buffer width {} is negative", self.buffer_width))
        }
        if self.max_grids == 0 {
            return fail("max_grids must be at least 1".into())
        }
        Ok(())
    }

    /**
     * Return the refinement ratios `(rx, ry)` between `level` and
     * `level + 1`.
     */
    pub fn ratio(&self, level: usize) -> (i64, i64) {
        (self.ratios_x[level - 1], self.ratios_y[level - 1])
    }

    /**
     * Return the accumulated refinement of `level` relative to level 1.
     */
    pub fn total_ratio(&self, level: usize) -> (i64, i64) {
        (1..level).fold((1, 1), |(ax, ay), l| {
            let (rx, ry) = self.ratio(l);
            (ax * rx, ay * ry)
        })
    }
}
