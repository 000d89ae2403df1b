use crate::flagging::FlaggedPoints;
use crate::index_space::{range2d, IndexSpace};
use crate::mask::DomainMask;




/**
 * Interface for turning the flagged points of a level into the boxes (in
 * that level's index space) over which finer grids are built. The boxes must
 * be pairwise disjoint, must cover every point, and must lie inside the
 * occupied part of `domain`.
 */
pub trait GridGenerator {
    fn generate(&self, points: &FlaggedPoints, domain: &DomainMask) -> Vec<IndexSpace>;
}




/**
 * A grid generator that recursively bisects the bounding box of the flagged
 * points until each box is at least `cutoff` full of flags and lies wholly
 * inside the domain. Cuts are placed at an empty row or column of the box
 * when one exists, and at the middle of its longest side otherwise.
 */
#[derive(Clone, Copy, Debug)]
pub struct BisectionClusterer {
    pub cutoff: f64,
}




// ============================================================================
impl BisectionClusterer {

    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    fn cluster(&self, points: Vec<(i64, i64)>, domain: &DomainMask, boxes: &mut Vec<IndexSpace>) {
        if points.is_empty() {
            return
        }
        let bbox = bounding_box(&points);
        let efficiency = points.len() as f64 / bbox.len() as f64;

        if bbox.len() == 1 || (efficiency >= self.cutoff && bbox.iter().all(|i| domain.is_occupied(i))) {
            boxes.push(bbox);
            return
        }

        let (ni, nj) = bbox.dim();
        let (i0, j0) = bbox.start();

        let (axis, cut) = if ni >= nj {
            (0, choose_cut(&points, i0, ni, |p| p.0))
        } else {
            (1, choose_cut(&points, j0, nj, |p| p.1))
        };
        let (lower, upper) = points
            .into_iter()
            .partition(|p| if axis == 0 { p.0 < cut } else { p.1 < cut });

        self.cluster(lower, domain, boxes);
        self.cluster(upper, domain, boxes);
    }
}

impl GridGenerator for BisectionClusterer {
    fn generate(&self, points: &FlaggedPoints, domain: &DomainMask) -> Vec<IndexSpace> {
        let mut boxes = Vec::new();
        self.cluster(points.points.clone(), domain, &mut boxes);
        boxes
    }
}




// ============================================================================
fn bounding_box(points: &[(i64, i64)]) -> IndexSpace {
    let (mut i0, mut j0) = (i64::MAX, i64::MAX);
    let (mut i1, mut j1) = (i64::MIN, i64::MIN);

    for &(i, j) in points {
        i0 = i0.min(i);
        j0 = j0.min(j);
        i1 = i1.max(i);
        j1 = j1.max(j);
    }
    range2d(i0..i1 + 1, j0..j1 + 1)
}

/**
 * Return the coordinate at which to split a box of length `n` starting at
 * `start`: the empty slice closest to the middle, or the middle itself. The
 * result always leaves points on both sides.
 */
fn choose_cut<F>(points: &[(i64, i64)], start: i64, n: usize, coord: F) -> i64
where
    F: Fn(&(i64, i64)) -> i64
{
    let mut signature = vec![0usize; n];

    for p in points {
        signature[(coord(p) - start) as usize] += 1;
    }
    let middle = n / 2;

    let hole = (1..n - 1)
        .filter(|&k| signature[k] == 0)
        .min_by_key(|&k| (k as i64 - middle as i64).abs());

    start + hole.unwrap_or(middle) as i64
}
