use floodgrid::arena::Arena;
use floodgrid::cluster::BisectionClusterer;
use floodgrid::conservation::{compute_total, Clock, ConservationMonitor};
use floodgrid::flagging::{colate, flag_level, CellContext};
use floodgrid::index_space::range2d;
use floodgrid::mask::{project_domain, DomainMask, MaskCell};
use floodgrid::regrid::{regrid_level, RegridOutcome};
use floodgrid::{Error, GridHierarchy, HierarchyConfig};




fn config(mx: i64, ratio: i64, max_levels: usize) -> HierarchyConfig {
    HierarchyConfig {
        mx,
        my: mx,
        lower: (0.0, 0.0),
        upper: (mx as f64 * 0.5, mx as f64 * 0.5),
        ghost_width: 2,
        nvar: 3,
        naux: 1,
        max_levels,
        ratios_x: vec![ratio; max_levels],
        ratios_y: vec![ratio; max_levels],
        arena_capacity: 1 << 18,
        buffer_width: 1,
        ..HierarchyConfig::default()
    }
}

fn checkerboard(cell: &CellContext<'_>) -> bool {
    (cell.index.0 * 7 + cell.index.1 * 3) % 5 == 0
}

fn front(cell: &CellContext<'_>) -> bool {
    (cell.q()[0] - cell.neighbor(1, 0)[0]).abs() > 0.5
}




// ============================================================================
#[test]
fn second_release_coalesces_for_a_large_request() {
    let mut arena = Arena::new(1000);
    let first = arena.acquire(400).unwrap();
    let second = arena.acquire(300).unwrap();

    arena.release(first).unwrap();
    assert!(matches!(arena.acquire(450), Err(Error::OutOfSpace { .. })));

    arena.release(second).unwrap();
    let big = arena.acquire(450).unwrap();
    assert_eq!(big.len(), 450);
    assert_eq!(arena.free_space(), 550);
}

#[test]
fn single_grid_constant_field_total() {
    let mut h = GridHierarchy::new(config(4, 2, 1)).unwrap();
    let id = h.create_grid(1, range2d(0..4, 0..4)).unwrap();
    h.view_mut(id).unwrap().fill(|_, q, _| q[0] = 2.0);

    assert_eq!(h.cell_size(1), (0.5, 0.5));
    assert_eq!(compute_total(&h, 1).unwrap(), 8.0);

    let mut monitor = ConservationMonitor::new();
    let report = monitor.check(&h, 1, Clock::fresh(0.0)).unwrap();
    assert_eq!((report.time, report.total, report.drift), (0.0, 8.0, 0.0));
}

#[test]
fn refined_border_ring_is_cleared() {
    let mut h = GridHierarchy::new(config(4, 2, 2)).unwrap();
    h.create_grid(1, range2d(0..4, 0..4)).unwrap();
    let mask = project_domain(&h, 1, 2).unwrap();

    for (index, cell) in mask.iter() {
        let (i, j) = index;
        if i == 0 || j == 0 || i == 7 || j == 7 {
            assert_eq!(cell, MaskCell::Outside, "border cell {:?}", index);
        }
    }
    assert!(mask.is_occupied((3, 3)));
    assert!(mask.is_occupied((4, 4)));
}

#[test]
fn colated_points_are_distinct_and_satisfy_the_predicate() {
    let mut h = GridHierarchy::new(config(16, 2, 2)).unwrap();
    h.create_grid(1, range2d(0..8, 0..16)).unwrap();
    h.create_grid(1, range2d(8..16, 0..10)).unwrap();

    let domain = project_domain(&h, 1, 1).unwrap();
    let mut flags = domain.clone();
    let k = flag_level(&h, 1, &mut flags, &checkerboard, 0.0).unwrap();
    let points = colate(&flags, &domain);

    assert_eq!(points.len(), k);
    assert_eq!(flags.count(MaskCell::Flagged), k);
    assert!(points.points.windows(2).all(|w| w[0] < w[1]));

    for &(i, j) in &points.points {
        assert_eq!((i * 7 + j * 3) % 5, 0);
        assert!(domain.is_occupied((i, j)));
    }
}

#[test]
fn regridded_levels_nest_in_the_eroded_coarse_domain() {
    let mut h = GridHierarchy::new(config(16, 2, 3)).unwrap();
    let coarse = h.create_grid(1, range2d(0..16, 0..16)).unwrap();
    h.view_mut(coarse).unwrap().fill(|(i, j), q, _| q[0] = if i + j < 14 { 2.0 } else { 1.0 });

    let clusterer = BisectionClusterer::new(0.7);
    let outcome = regrid_level(&mut h, 1, 1, &front, &clusterer, 0.0).unwrap();
    assert!(matches!(outcome, RegridOutcome::Refined { level: 1, .. }));

    let fine = DomainMask::from_level(&h, 2).unwrap();
    let eroded = DomainMask::from_level(&h, 1).unwrap().eroded();
    assert!(fine.occupied_count() > 0);
    assert!(fine.is_nested_in(&eroded, 2, 2));

    for id in h.grid_ids(2) {
        h.view_mut(id).unwrap().fill(|(i, j), q, _| q[0] = if i + j < 28 { 2.0 } else { 1.0 });
    }
    let outcome = regrid_level(&mut h, 1, 2, &front, &clusterer, 0.0).unwrap();
    assert!(matches!(outcome, RegridOutcome::Refined { level: 2, .. }));

    let finest = DomainMask::from_level(&h, 3).unwrap();
    let projected = project_domain(&h, 1, 2).unwrap();
    assert!(finest.is_nested_in(&projected, 2, 2));

    for l in 2..=3 {
        let ids = h.grid_ids(l);
        for (n, &a) in ids.iter().enumerate() {
            for &b in &ids[n + 1..] {
                assert!(!h.grid(a).unwrap().interior().overlaps(h.grid(b).unwrap().interior()));
            }
        }
    }
}

#[test]
fn tearing_down_every_level_returns_the_whole_arena() {
    let mut h = GridHierarchy::new(config(16, 2, 3)).unwrap();
    h.create_grid(1, range2d(0..16, 0..16)).unwrap();
    h.create_grid(2, range2d(4..12, 4..12)).unwrap();
    h.create_grid(2, range2d(12..20, 4..12)).unwrap();
    h.create_grid(3, range2d(10..30, 10..20)).unwrap();
    assert!(h.arena_stats().in_use > 0);

    h.clear_levels_from(1).unwrap();
    let stats = h.arena_stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.live, 0);
    assert_eq!(h.arena().free_ranges().collect::<Vec<_>>(), vec![(0, stats.capacity)]);
}
