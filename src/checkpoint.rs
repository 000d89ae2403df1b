use std::io::{Read, Write};
use serde::{Deserialize, Serialize};
use crate::config::HierarchyConfig;
use crate::conservation::ConservationMonitor;
use crate::error::{Error, Result};
use crate::hierarchy::GridHierarchy;
use crate::index_space::IndexSpace;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * The stored data of one grid, ghost cells included.
 */
pub struct GridSnapshot {
    pub level: usize,
    pub interior: IndexSpace,
    pub solution: Vec<f64>,
    pub aux: Option<Vec<f64>>,
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * Everything needed to restart a run: the configuration, every grid in
 * level-list order, and the conservation baseline.
 */
pub struct Checkpoint {
    pub config: HierarchyConfig,
    pub time: f64,
    pub baseline: Option<f64>,
    pub grids: Vec<GridSnapshot>,
}




// ============================================================================
impl Checkpoint {

    pub fn capture(hierarchy: &GridHierarchy, monitor: &ConservationMonitor, time: f64) -> Self {
        let mut grids = Vec::with_capacity(hierarchy.total_grids());

        for level in 1..=hierarchy.max_levels() {
            hierarchy.for_each_grid(level, |grid| {
                grids.push(GridSnapshot {
                    level,
                    interior: grid.record.interior().clone(),
                    solution: grid.solution.to_vec(),
                    aux: grid.aux.map(|a| a.to_vec()),
                })
            });
        }

        Self {
            config: hierarchy.config().clone(),
            time,
            baseline: monitor.baseline(),
            grids,
        }
    }

    /**
     * Rebuild the hierarchy and the conservation monitor. The restored run
     * must be checked with a restart clock so the baseline is kept.
     */
    pub fn restore(&self) -> Result<(GridHierarchy, ConservationMonitor)> {
        let mut hierarchy = GridHierarchy::new(self.config.clone())?;

        for snapshot in &self.grids {
            let id = hierarchy.create_grid(snapshot.level, snapshot.interior.clone())?;
            let mut view = hierarchy.view_mut(id)?;

            if view.solution.len() != snapshot.solution.len() {
                return Err(Error::Checkpoint(format!(
                    "grid {} holds {} solution values, expected {}",
                    snapshot.interior, snapshot.solution.len(), view.solution.len())))
            }
            view.solution.copy_from_slice(&snapshot.solution);

            match (view.aux.as_mut(), &snapshot.aux) {
                (Some(aux), Some(saved)) if aux.len() == saved.len() => aux.copy_from_slice(saved),
                (None, None) => {}
                _ => return Err(Error::Checkpoint(format!(
                    "grid {} has mismatched auxiliary data", snapshot.interior))),
            }
        }
        Ok((hierarchy, ConservationMonitor::with_baseline(self.baseline)))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        ciborium::ser::into_writer(self, writer).map_err(|e| Error::Checkpoint(format!("{:?}", e)))
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        ciborium::de::from_reader(reader).map_err(|e| Error::Checkpoint(format!("{:?}", e)))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Checkpoint;
    use crate::config::HierarchyConfig;
    use crate::conservation::{compute_total, Clock, ConservationMonitor};
    use crate::error::Error;
    use crate::hierarchy::GridHierarchy;
    use crate::index_space::range2d;

    fn one_grid_checkpoint() -> Checkpoint {
        let config = HierarchyConfig {
            mx: 4,
            my: 4,
            nvar: 1,
            naux: 1,
            max_levels: 1,
            arena_capacity: 1024,
            ..HierarchyConfig::default()
        };
        let mut h = GridHierarchy::new(config).unwrap();
        let id = h.create_grid(1, range2d(0..4, 0..4)).unwrap();
        h.view_mut(id).unwrap().fill(|(i, j), q, aux| { q[0] = (i + j) as f64; aux[0] = 1.0; });
        Checkpoint::capture(&h, &ConservationMonitor::new(), 0.0)
    }

    #[test]
    fn restart_rebuilds_grids_and_baseline() {
        let config = HierarchyConfig {
            mx: 8,
            my: 8,
            nvar: 2,
            naux: 1,
            capacity_index: Some(0),
            max_levels: 2,
            ratios_x: vec![2],
            ratios_y: vec![2],
            arena_capacity: 1 << 14,
            ..HierarchyConfig::default()
        };
        let mut h = GridHierarchy::new(config).unwrap();
        let a = h.create_grid(1, range2d(0..8, 0..8)).unwrap();
        let b = h.create_grid(2, range2d(4..10, 2..8)).unwrap();
        h.view_mut(a).unwrap().fill(|(i, j), q, aux| { q[0] = (i * j) as f64; aux[0] = 1.0 + 0.1 * i as f64; });
        h.view_mut(b).unwrap().fill(|(i, _), q, aux| { q[0] = 2.0 + i as f64; aux[0] = 1.0; });

        let mut monitor = ConservationMonitor::new();
        monitor.check(&h, 1, Clock::fresh(0.0)).unwrap();

        let mut bytes = Vec::new();
        Checkpoint::capture(&h, &monitor, 1.5).write_to(&mut bytes).unwrap();
        let checkpoint = Checkpoint::read_from(&bytes[..]).unwrap();
        assert_eq!(checkpoint.time, 1.5);

        let (restored, mut restored_monitor) = checkpoint.restore().unwrap();
        assert_eq!(restored.num_grids(1), 1);
        assert_eq!(restored.num_grids(2), 1);
        assert_eq!(compute_total(&restored, 1).unwrap(), compute_total(&h, 1).unwrap());
        assert_eq!(compute_total(&restored, 2).unwrap(), compute_total(&h, 2).unwrap());

        let clock = Clock { time: 1.5, tstart: 1.5, restart: true };
        let report = restored_monitor.check(&restored, 1, clock).unwrap();
        assert_eq!(restored_monitor.baseline(), monitor.baseline());
        assert_eq!(report.drift, 0.0);
    }

    #[test]
    fn truncated_solution_is_rejected() {
        let mut checkpoint = one_grid_checkpoint();
        checkpoint.grids[0].solution.pop();
        assert!(matches!(checkpoint.restore(), Err(Error::Checkpoint(_))));
    }

    #[test]
    fn missing_or_short_aux_is_rejected() {
        let mut checkpoint = one_grid_checkpoint();
        checkpoint.grids[0].aux = None;
        assert!(matches!(checkpoint.restore(), Err(Error::Checkpoint(_))));

        let mut checkpoint = one_grid_checkpoint();
        if let Some(aux) = checkpoint.grids[0].aux.as_mut() {
            aux.truncate(3);
        }
        assert!(matches!(checkpoint.restore(), Err(Error::Checkpoint(_))));
        assert!(one_grid_checkpoint().restore().is_ok());
    }
}
