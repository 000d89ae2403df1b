//! Level-wise totals of a conserved quantity, and drift from the total
//! captured at the start of a run.

use std::fmt;
use log::info;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::hierarchy::GridHierarchy;




/// Time information supplied by the time stepper.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub time: f64,
    pub tstart: f64,
    pub restart: bool,
}

impl Clock {
    pub fn fresh(tstart: f64) -> Self {
        Self { time: tstart, tstart, restart: false }
    }

    pub fn at(self, time: f64) -> Self {
        Self { time, ..self }
    }
}




/// One conservation diagnostic: the time, the level total, and its drift
/// from the baseline. `Display` writes the three fields on one fixed-width
/// line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConservationReport {
    pub level: usize,
    pub time: f64,
    pub total: f64,
    pub drift: f64,
}

impl fmt::Display for ConservationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "time t = {:>12.5e},  total volume = {:>22.15e},  change = {:>22.15e}",
            self.time, self.total, self.drift)
    }
}




/// Sum `component` of the solution over the interior cells of every grid at
/// `level`, weighted by the capacity field when one is configured, and
/// scaled once by the level's cell area. Grids at a level must not overlap.
pub fn level_sum(hierarchy: &GridHierarchy, level: usize, component: usize) -> Result<f64> {
    hierarchy.check_level(level)?;

    let capacity = hierarchy.config().capacity_index;
    let (hx, hy) = hierarchy.cell_size(level);

    let partial = hierarchy.par_map_level(level, |grid| {
        let cells = grid.record.interior().iter();

        match capacity {
            Some(m) => cells
                .map(|index| grid.q(index)[component] * grid.aux(index).map_or(1.0, |a| a[m]))
                .sum::<f64>(),
            None => cells
                .map(|index| grid.q(index)[component])
                .sum::<f64>(),
        }
    });

    Ok(partial.iter().sum::<f64>() * hx * hy)
}

/// The total volume (first solution component) at `level`.
pub fn compute_total(hierarchy: &GridHierarchy, level: usize) -> Result<f64> {
    level_sum(hierarchy, level, 0)
}




/// Keeper of the baseline total used to report drift.
#[derive(Clone, Debug, Default)]
pub struct ConservationMonitor {
    baseline: Option<f64>,
}




// ============================================================================
impl ConservationMonitor {

    pub fn new() -> Self {
        Self { baseline: None }
    }

    /// A monitor for a restarted run, whose baseline was saved earlier.
    pub fn with_baseline(baseline: Option<f64>) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    /// Compute the total at `level` and its drift. The first check at
    /// level 1, at the start time of a fresh run, records the baseline;
    /// restarted runs keep the baseline they were given.
    pub fn check(&mut self, hierarchy: &GridHierarchy, level: usize, clock: Clock) -> Result<ConservationReport> {
        let total = compute_total(hierarchy, level)?;

        if level == 1 && clock.time == clock.tstart && !clock.restart && self.baseline.is_none() {
            self.baseline = Some(total);
        }

        let report = ConservationReport {
            level,
            time: clock.time,
            total,
            drift: total - self.baseline.unwrap_or(0.0),
        };

        if level <= hierarchy.config().verbosity {
            info!("{}", report);
        }
        Ok(report)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{compute_total, Clock, ConservationMonitor, ConservationReport};
    use crate::config::HierarchyConfig;
    use crate::hierarchy::GridHierarchy;
    use crate::index_space::range2d;

    fn config(capacity_index: Option<usize>) -> HierarchyConfig {
        HierarchyConfig {
            mx: 4,
            my: 4,
            lower: (0.0, 0.0),
            upper: (2.0, 2.0),
            ghost_width: 2,
            nvar: 3,
            naux: 2,
            capacity_index,
            max_levels: 2,
            ratios_x: vec![2],
            ratios_y: vec![2],
            arena_capacity: 10_000,
            ..HierarchyConfig::default()
        }
    }

    #[test]
    fn constant_field_on_one_grid() {
        let mut h = GridHierarchy::new(config(None)).unwrap();
        let id = h.create_grid(1, range2d(0..4, 0..4)).unwrap();
        h.view_mut(id).unwrap().fill(|_, q, _| q[0] = 2.0);
        assert_eq!(h.cell_size(1), (0.5, 0.5));
        assert_eq!(compute_total(&h, 1).unwrap(), 8.0);
    }

    #[test]
    fn ghost_cells_are_not_counted() {
        let mut h = GridHierarchy::new(config(None)).unwrap();
        let id = h.create_grid(1, range2d(1..3, 1..3)).unwrap();
        h.view_mut(id).unwrap().fill(|index, q, _| {
            q[0] = if range2d(1..3, 1..3).contains(index) { 1.0 } else { 100.0 }
        });
        assert_eq!(compute_total(&h, 1).unwrap(), 4.0 * 0.25);
    }

    #[test]
    fn capacity_weights_each_cell() {
        let mut h = GridHierarchy::new(config(Some(1))).unwrap();
        let a = h.create_grid(1, range2d(0..2, 0..4)).unwrap();
        let b = h.create_grid(1, range2d(2..4, 0..4)).unwrap();
        h.view_mut(a).unwrap().fill(|_, q, aux| { q[0] = 3.0; aux[1] = 2.0; });
        h.view_mut(b).unwrap().fill(|_, q, aux| { q[0] = 3.0; aux[1] = 0.5; });

        let expected = (8.0 * 3.0 * 2.0 + 8.0 * 3.0 * 0.5) * 0.25;
        assert_eq!(compute_total(&h, 1).unwrap(), expected);

        let mut h = GridHierarchy::new(config(None)).unwrap();
        let a = h.create_grid(1, range2d(0..2, 0..4)).unwrap();
        h.view_mut(a).unwrap().fill(|_, q, aux| { q[0] = 3.0; aux[1] = 2.0; });
        assert_eq!(compute_total(&h, 1).unwrap(), 8.0 * 3.0 * 0.25);
    }

    #[test]
    fn empty_level_sums_to_zero() {
        let h = GridHierarchy::new(config(None)).unwrap();
        assert_eq!(compute_total(&h, 2).unwrap(), 0.0);
        assert!(compute_total(&h, 3).is_err());
    }

    #[test]
    fn baseline_is_captured_once_on_a_fresh_run() {
        let mut h = GridHierarchy::new(config(None)).unwrap();
        let id = h.create_grid(1, range2d(0..4, 0..4)).unwrap();
        h.view_mut(id).unwrap().fill(|_, q, _| q[0] = 1.0);

        let clock = Clock::fresh(0.0);
        let mut monitor = ConservationMonitor::new();
        let first = monitor.check(&h, 1, clock).unwrap();
        assert_eq!(monitor.baseline(), Some(4.0));
        assert_eq!(first.drift, 0.0);

        h.view_mut(id).unwrap().fill(|_, q, _| q[0] = 1.5);
        let later = monitor.check(&h, 1, clock.at(0.5)).unwrap();
        assert_eq!(later.total, 6.0);
        assert_eq!(later.drift, 2.0);

        // a second check at the start time does not move the baseline
        monitor.check(&h, 1, clock).unwrap();
        assert_eq!(monitor.baseline(), Some(4.0));
    }

    #[test]
    fn restarted_run_keeps_its_baseline() {
        let mut h = GridHierarchy::new(config(None)).unwrap();
        let id = h.create_grid(1, range2d(0..4, 0..4)).unwrap();
        h.view_mut(id).unwrap().fill(|_, q, _| q[0] = 1.0);

        let clock = Clock { time: 2.0, tstart: 2.0, restart: true };
        let mut monitor = ConservationMonitor::with_baseline(Some(3.0));
        let report = monitor.check(&h, 1, clock).unwrap();
        assert_eq!(monitor.baseline(), Some(3.0));
        assert_eq!(report.drift, 1.0);
    }

    #[test]
    fn report_line_carries_three_fields() {
        let report = ConservationReport { level: 1, time: 0.5, total: 8.0, drift: -1.0e-12 };
        let line = report.to_string();
        assert!(line.starts_with("time t = "));
        assert!(line.contains("total volume = "));
        assert!(line.contains("change = "));
        assert!(line.contains("5.00000e-1"));
        assert!(line.contains("8.000000000000000e0"));
        assert!(line.contains("-1.000000000000000e-12"));
    }
}
