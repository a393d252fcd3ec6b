//! Activity-rate clustering.
//!
//! One-dimensional k-means with k-means++ seeding and independent restarts.
//! Final centroids are sorted ascending so `ClusterId(0)` is always the
//! least active group.

use lva_common::{ClusterId, Error, Result, TrainingExample};
use lva_config::ClusteringConfig;
use rand::Rng;
use tracing::debug;

/// Output of one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub centroids: Vec<f64>,
    /// Index into `centroids` for every input value.
    pub assignments: Vec<usize>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

/// Index of the closest centroid; ties go to the lowest index.
pub fn nearest_centroid(centroids: &[f64], x: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = (x - c).abs();
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Lloyd iterations from the given seeds.
///
/// A centroid that loses all its members stays where it was. Stops once no
/// centroid moves by more than `tolerance`.
pub fn lloyd_1d(
    values: &[f64],
    seeds: Vec<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> KMeansResult {
    let k = seeds.len();
    let mut centroids = seeds;
    let mut assignments = vec![0; values.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        for (slot, x) in assignments.iter_mut().zip(values) {
            *slot = nearest_centroid(&centroids, *x);
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (a, x) in assignments.iter().zip(values) {
            sums[*a] += x;
            counts[*a] += 1;
        }

        let mut max_shift: f64 = 0.0;
        for i in 0..k {
            if counts[i] > 0 {
                let updated = sums[i] / counts[i] as f64;
                max_shift = max_shift.max((updated - centroids[i]).abs());
                centroids[i] = updated;
            }
        }
        if max_shift <= tolerance {
            break;
        }
    }

    for (slot, x) in assignments.iter_mut().zip(values) {
        *slot = nearest_centroid(&centroids, *x);
    }
    let inertia = assignments
        .iter()
        .zip(values)
        .map(|(a, x)| (x - centroids[*a]).powi(2))
        .sum();

    KMeansResult {
        centroids,
        assignments,
        inertia,
        iterations,
    }
}

/// k-means++ seeding: first seed uniform, then proportional to squared
/// distance from the nearest chosen seed.
pub fn kmeans_plus_plus_seeds<R: Rng>(values: &[f64], k: usize, rng: &mut R) -> Vec<f64> {
    let mut seeds = Vec::with_capacity(k);
    if values.is_empty() || k == 0 {
        return seeds;
    }
    seeds.push(values[rng.random_range(0..values.len())]);

    let mut dist_sq: Vec<f64> = values.iter().map(|x| (x - seeds[0]).powi(2)).collect();
    while seeds.len() < k {
        let total: f64 = dist_sq.iter().sum();
        let next = if total > 0.0 && total.is_finite() {
            let threshold = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = values.len() - 1;
            for (i, d) in dist_sq.iter().enumerate() {
                cumulative += d;
                if cumulative > threshold {
                    chosen = i;
                    break;
                }
            }
            values[chosen]
        } else {
            values[rng.random_range(0..values.len())]
        };
        seeds.push(next);
        for (d, x) in dist_sq.iter_mut().zip(values) {
            *d = d.min((x - next).powi(2));
        }
    }
    seeds
}

/// Best of `restarts` seeded k-means runs, centroids sorted ascending.
pub fn kmeans_1d<R: Rng>(
    values: &[f64],
    config: &ClusteringConfig,
    rng: &mut R,
) -> Result<KMeansResult> {
    if values.is_empty() {
        return Err(Error::InvalidTrainingSet(
            "cannot cluster an empty set of rates".to_string(),
        ));
    }
    if config.clusters == 0 {
        return Err(Error::InvalidArgument("cluster count must be at least 1".to_string()));
    }

    let mut best: Option<KMeansResult> = None;
    for _ in 0..config.restarts.max(1) {
        let seeds = kmeans_plus_plus_seeds(values, config.clusters, rng);
        let run = lloyd_1d(values, seeds, config.max_iterations, config.tolerance);
        let improves = match &best {
            Some(b) => run.inertia < b.inertia,
            None => true,
        };
        if improves {
            best = Some(run);
        }
    }
    let Some(best) = best else {
        return Err(Error::InvalidTrainingSet("k-means produced no run".to_string()));
    };

    let mut centroids = best.centroids;
    centroids.sort_by(|a, b| a.total_cmp(b));
    let assignments = values.iter().map(|x| nearest_centroid(&centroids, *x)).collect();
    Ok(KMeansResult {
        centroids,
        assignments,
        inertia: best.inertia,
        iterations: best.iterations,
    })
}

/// Activity rate of every example, in input order.
pub fn activity_rates(examples: &[TrainingExample]) -> Result<Vec<f64>> {
    examples
        .iter()
        .map(|ex| {
            ex.outcome.activity_rate().map_err(|e| match e {
                Error::InvalidTrainingSet(msg) => {
                    Error::InvalidTrainingSet(format!("user {}: {}", ex.user_id, msg))
                }
                other => other,
            })
        })
        .collect()
}

/// Users partitioned by activity rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Ascending centroid rates; index is the cluster id.
    pub centroids: Vec<f64>,
    /// Cluster of each input example, in input order.
    pub labels: Vec<ClusterId>,
    pub inertia: f64,
}

impl Partition {
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Number of users in every cluster.
    pub fn member_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }
}

/// Groups training users by activity rate.
#[derive(Debug, Clone)]
pub struct ClusterAssigner {
    config: ClusteringConfig,
}

impl ClusterAssigner {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn assign<R: Rng>(
        &self,
        examples: &[TrainingExample],
        rng: &mut R,
    ) -> Result<Partition> {
        if examples.is_empty() {
            return Err(Error::InvalidTrainingSet("no training examples".to_string()));
        }
        let rates = activity_rates(examples)?;
        let result = kmeans_1d(&rates, &self.config, rng)?;
        debug!(
            clusters = result.centroids.len(),
            inertia = result.inertia,
            iterations = result.iterations,
            "k-means finished"
        );
        Ok(Partition {
            labels: result.assignments.iter().map(|a| ClusterId(*a)).collect(),
            centroids: result.centroids,
            inertia: result.inertia,
        })
    }
}
