//! One regridding step: derive the eligible domain, flag, buffer, colate,
//! generate boxes, and replace the next finer level.

use log::info;
use crate::cluster::GridGenerator;
use crate::error::{Error, Result};
use crate::flagging::{buffer_flags, colate, flag_level, ErrorEstimator, FlaggedPoints};
use crate::grid::GridId;
use crate::hierarchy::GridHierarchy;
use crate::mask::{project_domain, DomainMask};




/// Result of regridding above one level.
#[derive(Clone, Debug, PartialEq)]
pub enum RegridOutcome {
    /// No cell at `level` needed refinement; every finer level was removed.
    Quiet { level: usize },
    /// New grids were built at `level + 1`.
    Refined { level: usize, flagged: usize, grids: Vec<GridId> },
}




/// Flag the cells of `lcheck` needing refinement, restricted to the domain
/// of `base` projected up to `lcheck`. Returns the buffered flagged points
/// and the eligible domain mask they were taken from.
pub fn flag_points<E>(
    hierarchy: &GridHierarchy,
    base: usize,
    lcheck: usize,
    estimator: &E,
    time: f64) -> Result<(FlaggedPoints, DomainMask)>
where
    E: ErrorEstimator + ?Sized
{
    let domain = project_domain(hierarchy, base, lcheck)?;
    let mut flags = domain.clone();

    if flag_level(hierarchy, lcheck, &mut flags, estimator, time)? > 0 {
        buffer_flags(&mut flags, hierarchy.config().buffer_width);
    }
    Ok((colate(&flags, &domain), domain))
}




/// Rebuild level `lcheck + 1` from the flags at `lcheck`. A quiet level
/// removes `lcheck + 1` and every finer level. Grids finer than
/// `lcheck + 1` are left in place otherwise; callers regrid them next, from
/// coarse to fine. New grids have zeroed data, to be filled by the caller.
pub fn regrid_level<E, G>(
    hierarchy: &mut GridHierarchy,
    base: usize,
    lcheck: usize,
    estimator: &E,
    generator: &G,
    time: f64) -> Result<RegridOutcome>
where
    E: ErrorEstimator + ?Sized,
    G: GridGenerator + ?Sized,
{
    if lcheck >= hierarchy.max_levels() {
        return Err(Error::InvalidLevel { level: lcheck + 1, max_levels: hierarchy.max_levels() })
    }
    let (points, domain) = flag_points(hierarchy, base, lcheck, estimator, time)?;

    if points.is_empty() {
        hierarchy.clear_levels_from(lcheck + 1)?;
        info!("regrid level {}: no cells flagged of {}", lcheck, points.npts);
        return Ok(RegridOutcome::Quiet { level: lcheck })
    }

    let (rx, ry) = hierarchy.config().ratio(lcheck);
    let boxes = generator.generate(&points, &domain);
    let grids = hierarchy.replace_level(lcheck + 1, boxes.iter().map(|b| b.refine(rx, ry)))?;

    info!("regrid level {}: {} of {} cells flagged, {} new grids at level {}",
        lcheck, points.len(), points.npts, grids.len(), lcheck + 1);

    Ok(RegridOutcome::Refined { level: lcheck, flagged: points.len(), grids })
}
