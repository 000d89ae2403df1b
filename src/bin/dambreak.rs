use std::fs::File;
use std::io::BufWriter;
use clap::Parser;
use log::{error, info};
use floodgrid::checkpoint::Checkpoint;
use floodgrid::cluster::BisectionClusterer;
use floodgrid::conservation::{Clock, ConservationMonitor};
use floodgrid::flagging::{CellContext, ErrorEstimator};
use floodgrid::grid::GridId;
use floodgrid::index_space::range2d;
use floodgrid::regrid::{regrid_level, RegridOutcome};
use floodgrid::{GridHierarchy, HierarchyConfig};




#[derive(Debug, Parser)]
#[clap(version = "0.1", about = "Regrid a dam-break water column on an AMR hierarchy")]
struct Opts {
    #[clap(short = 'n', long, default_value = "32")]
    cells: i64,

    #[clap(short = 'l', long, default_value = "3")]
    max_levels: usize,

    #[clap(short = 'r', long, default_value = "4")]
    ratio: i64,

    #[clap(short = 's', long, default_value = "5")]
    steps: usize,

    #[clap(long, default_value = "0.05")]
    tolerance: f64,

    #[clap(long, default_value = "4194304")]
    arena_capacity: usize,

    #[clap(short = 'v', long, default_value = "info")]
    log_level: String,

    #[clap(short = 'c', long)]
    checkpoint: Option<String>,
}




/**
 * Flags cells where the water depth jumps by more than `tolerance` to any
 * of the four face neighbours.
 */
struct DepthJump {
    tolerance: f64,
}

impl ErrorEstimator for DepthJump {
    fn needs_refinement(&self, cell: &CellContext<'_>) -> bool {
        let h = cell.q()[0];
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .any(|&(di, dj)| (cell.neighbor(di, dj)[0] - h).abs() > self.tolerance)
    }
}




// ============================================================================
fn dam_position(time: f64) -> f64 {
    0.5 + 0.25 * time
}

fn fill_water_column(hierarchy: &mut GridHierarchy, level: usize, ids: &[GridId], time: f64) -> floodgrid::Result<()> {
    let lower = hierarchy.config().lower;
    let (hx, _) = hierarchy.cell_size(level);
    let dam = dam_position(time);

    for &id in ids {
        hierarchy.view_mut(id)?.fill(|(i, _), q, aux| {
            let x = lower.0 + (i as f64 + 0.5) * hx;
            q[0] = if x < dam { 2.0 } else { 1.0 };
            q[1] = 0.0;
            q[2] = 0.0;
            aux.iter_mut().for_each(|b| *b = 0.0);
        });
    }
    Ok(())
}

fn run(opts: &Opts) -> floodgrid::Result<()> {
    let config = HierarchyConfig {
        mx: opts.cells,
        my: opts.cells,
        max_levels: opts.max_levels,
        ratios_x: vec![opts.ratio; opts.max_levels],
        ratios_y: vec![opts.ratio; opts.max_levels],
        arena_capacity: opts.arena_capacity,
        ..HierarchyConfig::default()
    };
    let mut hierarchy = GridHierarchy::new(config)?;
    let coarse = hierarchy.create_grid(1, range2d(0..opts.cells, 0..opts.cells))?;

    let estimator = DepthJump { tolerance: opts.tolerance };
    let clusterer = BisectionClusterer::new(hierarchy.config().cutoff);
    let clock = Clock::fresh(0.0);
    let mut monitor = ConservationMonitor::new();
    let dt = 0.1;

    for step in 0..opts.steps {
        let time = step as f64 * dt;
        fill_water_column(&mut hierarchy, 1, &[coarse], time)?;

        for lcheck in 1..opts.max_levels {
            let outcome = regrid_level(&mut hierarchy, 1, lcheck, &estimator, &clusterer, time)
                .map_err(|e| {
                    error!("regridding above level {} failed: {}", lcheck, e);
                    e
                })?;

            match outcome {
                RegridOutcome::Refined { grids, .. } => fill_water_column(&mut hierarchy, lcheck + 1, &grids, time)?,
                RegridOutcome::Quiet { .. } => break,
            }
        }
        monitor.check(&hierarchy, 1, clock.at(time))?;

        let stats = hierarchy.arena_stats();
        info!("step {}: {} grids on {} levels, arena {} of {} cells in use (high water {})",
            step, hierarchy.total_grids(), hierarchy.finest_level(), stats.in_use, stats.capacity, stats.high_water);
    }

    if let Some(path) = &opts.checkpoint {
        let file = File::create(path).map_err(|e| floodgrid::Error::Checkpoint(e.to_string()))?;
        let time = opts.steps.saturating_sub(1) as f64 * dt;
        Checkpoint::capture(&hierarchy, &monitor, time).write_to(BufWriter::new(file))?;
        info!("wrote checkpoint {}", path);
    }
    Ok(())
}




// ============================================================================
fn main() {
    let opts = Opts::parse();

    let level = opts.log_level.parse().unwrap_or(log::Level::Info);

    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("{}", e);
    }

    if let Err(e) = run(&opts) {
        error!("run aborted: {}", e);
        std::process::exit(1);
    }
}
