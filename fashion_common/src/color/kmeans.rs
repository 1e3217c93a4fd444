//! Seeded Lloyd k-means over RGB triples.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Point = [f64; 3];

/// Result of one clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub centroids: Vec<Point>,
    /// Cluster index for every input point.
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
}

impl Clustering {
    /// Number of points assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    /// Independent k-means++ restarts; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold on the summed squared centroid shift.
    pub tol: f64,
    pub seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }

    /// Clusters `points`. Returns `None` for empty input or `k == 0`.
    pub fn fit(&self, points: &[Point]) -> Option<Clustering> {
        if points.is_empty() || self.k == 0 {
            return None;
        }
        let k = self.k.min(points.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<Clustering> = None;
        for _ in 0..self.n_init.max(1) {
            let seeds = plus_plus_init(points, k, &mut rng);
            let run = lloyd(points, seeds, self.max_iter, self.tol);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best
    }
}

pub fn squared_distance(a: &Point, b: &Point) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (i, dist);
        }
    }
    best
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the chosen ones.
fn plus_plus_init(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut dists: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dists.iter().sum();
        let next = if total <= 0.0 {
            // Every point coincides with a centroid already.
            rng.gen_range(0..points.len())
        } else {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = None;
            for (i, &d) in dists.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                acc += d;
                chosen = Some(i);
                if acc >= target {
                    break;
                }
            }
            chosen.unwrap_or(0)
        };

        let centroid = points[next];
        for (d, p) in dists.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd(points: &[Point], mut centroids: Vec<Point>, max_iter: usize, tol: f64) -> Clustering {
    let k = centroids.len();
    let mut labels = vec![0; points.len()];

    for _ in 0..max_iter {
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (label, p) in labels.iter_mut().zip(points) {
            let (idx, _) = nearest(p, &centroids);
            *label = idx;
            sums[idx][0] += p[0];
            sums[idx][1] += p[1];
            sums[idx][2] += p[2];
            counts[idx] += 1;
        }

        let mut shift = 0.0;
        for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            // Empty clusters keep their previous centroid.
            if count == 0 {
                continue;
            }
            let n = count as f64;
            let updated = [sum[0] / n, sum[1] / n, sum[2] / n];
            shift += squared_distance(centroid, &updated);
            *centroid = updated;
        }

        if shift <= tol {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, p) in labels.iter_mut().zip(points) {
        let (idx, dist) = nearest(p, &centroids);
        *label = idx;
        inertia += dist;
    }

    Clustering {
        centroids,
        labels,
        inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..30 {
            let jitter = (i % 3) as f64;
            points.push([10.0 + jitter, 10.0, 10.0]);
            points.push([200.0, 30.0 + jitter, 40.0]);
        }
        points
    }

    #[test]
    fn separates_two_blobs() {
        let clustering = KMeans::new(2).fit(&blobs()).unwrap();
        let sizes = clustering.cluster_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 60);
        assert_eq!(sizes, vec![30, 30]);

        let mut reds: Vec<f64> = clustering.centroids.iter().map(|c| c[0]).collect();
        reds.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((reds[0] - 11.0).abs() < 1e-9);
        assert!((reds[1] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_result() {
        let points = blobs();
        let a = KMeans::new(3).fit(&points).unwrap();
        let b = KMeans::new(3).fit(&points).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn k_is_capped_by_point_count() {
        let points = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let clustering = KMeans::new(5).fit(&points).unwrap();
        assert_eq!(clustering.centroids.len(), 2);
        assert_eq!(clustering.inertia, 0.0);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(KMeans::new(3).fit(&[]).is_none());
        assert!(KMeans::new(0).fit(&[[0.0, 0.0, 0.0]]).is_none());
    }
}
