//! Flagging cells for refinement, and collecting the flags into a list of
//! points for grid generation.

use log::debug;
use crate::config::Region;
use crate::error::Result;
use crate::grid::GridView;
use crate::hierarchy::GridHierarchy;
use crate::mask::{DomainMask, MaskCell};




/// Everything an error estimator may inspect about one interior cell.
#[derive(Clone, Copy)]
pub struct CellContext<'a> {
    pub level: usize,
    pub index: (i64, i64),
    pub center: (f64, f64),
    pub cell_size: (f64, f64),
    pub time: f64,
    pub grid: GridView<'a>,
}

impl<'a> CellContext<'a> {
    pub fn q(&self) -> &'a [f64] {
        self.grid.q(self.index)
    }

    pub fn aux(&self) -> Option<&'a [f64]> {
        self.grid.aux(self.index)
    }

    /// Solution values of a neighbouring cell, offset by `(di, dj)`. Offsets
    /// up to the ghost width are always stored; larger ones panic.
    pub fn neighbor(&self, di: i64, dj: i64) -> &'a [f64] {
        self.grid.q((self.index.0 + di, self.index.1 + dj))
    }
}




/// The physical refinement criterion. Implementations must be pure
/// functions of the grid state, since cells are evaluated on several
/// threads at once.
pub trait ErrorEstimator: Sync {
    fn needs_refinement(&self, cell: &CellContext<'_>) -> bool;
}

impl<F> ErrorEstimator for F
where
    F: Fn(&CellContext<'_>) -> bool + Sync
{
    fn needs_refinement(&self, cell: &CellContext<'_>) -> bool {
        self(cell)
    }
}




#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RegionRule {
    Free,
    Forbid,
    Force,
}




fn region_rule(regions: &[Region], level: usize, time: f64, center: (f64, f64)) -> RegionRule {
    let mut max_level = None;
    let mut min_level = 0;

    for r in regions.iter().filter(|r| r.is_active(time) && r.contains(center)) {
        max_level = Some(max_level.map_or(r.max_level, |m: usize| m.max(r.max_level)));
        min_level = min_level.max(r.min_level);
    }
    match max_level {
        Some(m) if level >= m => RegionRule::Forbid,
        _ if level < min_level => RegionRule::Force,
        _ => RegionRule::Free,
    }
}




/// Evaluate the error estimator on every interior cell of every grid at
/// `level`, and mark the cells needing refinement as `Flagged` in `mask`.
/// Only cells the mask holds as `Inside` can be flagged; refinement
/// regions may further forbid or force a flag. Returns the number of cells
/// flagged by this call.
pub fn flag_level<E>(
    hierarchy: &GridHierarchy,
    level: usize,
    mask: &mut DomainMask,
    estimator: &E,
    time: f64) -> Result<usize>
where
    E: ErrorEstimator + ?Sized
{
    hierarchy.check_level(level)?;

    let regions = &hierarchy.config().regions;
    let cell_size = hierarchy.cell_size(level);
    let eligible: &DomainMask = mask;

    let flagged = hierarchy.par_map_level(level, |grid| {
        grid.record
            .interior()
            .iter()
            .filter(|&index| eligible.get(index) == MaskCell::Inside)
            .filter(|&index| {
                let center = hierarchy.cell_center(level, index);

                match region_rule(regions, level, time, center) {
                    RegionRule::Forbid => false,
                    RegionRule::Force => true,
                    RegionRule::Free => estimator.needs_refinement(&CellContext {
                        level,
                        index,
                        center,
                        cell_size,
                        time,
                        grid,
                    }),
                }
            })
            .collect::<Vec<_>>()
    });

    let mut count = 0;

    for index in flagged.into_iter().flatten() {
        mask.set(index, MaskCell::Flagged);
        count += 1;
    }
    debug!("flagged {} cells at level {}", count, level);
    Ok(count)
}




/// Grow every flagged cell into the `Inside` cells within `width` of it
/// (corners included). Cells outside the domain are never flagged. Returns
/// the number of flagged cells afterwards.
pub fn buffer_flags(mask: &mut DomainMask, width: i64) -> usize {
    let seeds: Vec<_> = mask
        .iter()
        .filter(|(_, c)| *c == MaskCell::Flagged)
        .map(|(index, _)| index)
        .collect();

    for (i, j) in seeds {
        for di in -width..=width {
            for dj in -width..=width {
                let index = (i + di, j + dj);

                if mask.get(index) == MaskCell::Inside {
                    mask.set(index, MaskCell::Flagged)
                }
            }
        }
    }
    mask.count(MaskCell::Flagged)
}




/// The flagged cells of one level in row-major order, and the number of
/// occupied cells of the domain they were taken from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlaggedPoints {
    pub points: Vec<(i64, i64)>,
    pub npts: usize,
}

impl FlaggedPoints {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}




/// Collect the coordinates of every cell flagged in `flags` that lies in the
/// occupied part of `domain`. An empty result is a normal outcome: nothing
/// at this level needs refinement.
pub fn colate(flags: &DomainMask, domain: &DomainMask) -> FlaggedPoints {
    let points = flags
        .iter()
        .filter(|&(index, cell)| cell == MaskCell::Flagged && domain.is_occupied(index))
        .map(|(index, _)| index)
        .collect();

    FlaggedPoints { points, npts: domain.occupied_count() }
}
