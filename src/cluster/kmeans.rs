//! K-means: Lloyd iterations from a seeded k-means++ start.
//!
//! # The Algorithm
//!
//! 1. **Seeding** (k-means++, Arthur & Vassilvitskii 2007): the first centroid is a
//!    uniformly chosen sample; each following centroid is drawn with probability
//!    proportional to the squared distance to the nearest centroid chosen so far.
//!    We use the greedy variant: several candidates are drawn per step and the one
//!    that lowers the total potential the most is kept.
//!
//! 2. **Assignment**: every sample goes to its nearest centroid (squared Euclidean
//!    distance, ties to the lowest cluster id).
//!
//! 3. **Update**: every centroid moves to the mean of its members. A cluster that lost
//!    all members is reseeded with the sample lying farthest from its own centroid.
//!
//! 4. Stop once no centroid moved by more than `tolerance`, or after `max_iter` passes.
//!
//! ## Determinism
//!
//! The same `(data, k, seed, max_iter, tolerance)` always produces the same
//! [`KmeansFit`]. The assignment step runs in parallel, but partial sums of the update
//! step are combined in a fixed chunk order, so the thread count never changes the
//! floating-point result.
//!
//! ## Complexity
//!
//! O(n k d) per iteration. Seeding is O(n k d log k).

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::traits::Clustering;
use super::util::{euclidean, nearest_centroid, squared_euclidean};
use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Samples per partial sum in the update step.
const REDUCE_CHUNK: usize = 1024;

/// K-means clustering (Lloyd's algorithm).
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

impl Kmeans {
    /// Create a new K-means clusterer for `k` clusters.
    ///
    /// Defaults: `max_iter = 20`, `tolerance = 1e-4`, `seed = 0`.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 20,
            tolerance: 1e-4,
            seed: 0,
        }
    }

    /// Set maximum number of Lloyd iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence threshold on centroid displacement (Euclidean).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the seed of the k-means++ initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Requested number of clusters.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Lloyd iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Convergence threshold on centroid displacement.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Seed of the k-means++ initialization.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit on `data` and return centroids, assignments and diagnostics.
    pub fn fit(&self, data: &Dataset) -> Result<KmeansFit> {
        self.fit_with_cancel(data, &AtomicBool::new(false))
    }

    /// Like [`Kmeans::fit`], but stops early once `cancel` is set.
    ///
    /// The flag is only read between iterations, and the first iteration always runs,
    /// so a cancelled fit still returns a complete, self-consistent model.
    pub fn fit_with_cancel(&self, data: &Dataset, cancel: &AtomicBool) -> Result<KmeansFit> {
        self.validate(data)?;

        let n = data.len();
        let dim = data.dim();
        let k = self.k;

        let mut centroids = self.init_plus_plus(data);
        let mut assignments = vec![0usize; n];
        let mut termination = Termination::MaxIterations;
        let mut iterations = 0;

        for iteration in 0..self.max_iter {
            if iteration > 0 && cancel.load(Ordering::Relaxed) {
                termination = Termination::Cancelled;
                break;
            }

            let cost = assign(data, &centroids, &mut assignments);
            let (mut updated, sizes) = update_centroids(data, &assignments, k);
            let reseeded = reseed_empty(data, &assignments, &sizes, &mut updated);
            if reseeded > 0 {
                warn!(
                    "k-means iteration {}: reseeded {} empty cluster(s)",
                    iteration, reseeded
                );
            }

            let shift = max_displacement(&centroids, &updated, dim);
            centroids = updated;
            iterations = iteration + 1;
            debug!(
                "k-means iteration {}: cost {:.6}, max centroid shift {:.6}",
                iteration, cost, shift
            );

            if shift < self.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        match termination {
            Termination::Converged => {
                debug!("k-means (k={}) converged after {} iterations", k, iterations)
            }
            Termination::MaxIterations => warn!(
                "k-means (k={}) stopped at max_iter={} before reaching tolerance {}",
                k, self.max_iter, self.tolerance
            ),
            Termination::Cancelled => {
                debug!("k-means (k={}) cancelled after {} iterations", k, iterations)
            }
        }

        let wss = within_cluster_sum_of_squares(data, &centroids, &assignments);
        Ok(KmeansFit {
            k,
            dim,
            centroids,
            assignments,
            wss,
            iterations,
            termination,
        })
    }

    fn validate(&self, data: &Dataset) -> Result<()> {
        if self.k == 0 || self.k > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: data.len(),
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1",
            });
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                message: "must be a positive finite number",
            });
        }
        Ok(())
    }

    /// Greedy k-means++ seeding. Returns a flat `k * dim` centroid buffer.
    fn init_plus_plus(&self, data: &Dataset) -> Vec<f64> {
        let n = data.len();
        let dim = data.dim();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let trials = 2 + (self.k as f64).ln().floor() as usize;

        let mut centroids = Vec::with_capacity(self.k * dim);
        let mut chosen = vec![false; n];

        let first = rng.random_range(0..n);
        chosen[first] = true;
        centroids.extend_from_slice(data.row(first));
        let mut min_d2: Vec<f64> = data
            .rows()
            .map(|p| squared_euclidean(p, data.row(first)))
            .collect();

        for _ in 1..self.k {
            let total: f64 = min_d2.iter().sum();

            let next = if total > 0.0 {
                let mut best = None;
                let mut best_potential = f64::INFINITY;
                for _ in 0..trials {
                    let candidate = sample_weighted(&min_d2, total, rng.random::<f64>());
                    let cand = data.row(candidate);
                    let potential: f64 = data
                        .rows()
                        .zip(&min_d2)
                        .map(|(p, &d)| d.min(squared_euclidean(p, cand)))
                        .sum();
                    if potential < best_potential {
                        best_potential = potential;
                        best = Some(candidate);
                    }
                }
                best.unwrap_or_else(|| sample_weighted(&min_d2, total, 0.0))
            } else {
                // Every sample coincides with a chosen centroid: fall back to a uniform pick.
                let remaining: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
                remaining[rng.random_range(0..remaining.len())]
            };

            chosen[next] = true;
            let c = data.row(next);
            centroids.extend_from_slice(c);
            for (d, p) in min_d2.iter_mut().zip(data.rows()) {
                *d = d.min(squared_euclidean(p, c));
            }
        }

        centroids
    }
}

impl Default for Kmeans {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &Dataset) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.assignments)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Why a fit stopped iterating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Maximum centroid displacement dropped below the tolerance.
    Converged,
    /// `max_iter` passes ran without reaching the tolerance.
    MaxIterations,
    /// The cancellation flag was observed between iterations.
    Cancelled,
}

/// A fitted K-means model.
///
/// Every sample has exactly one cluster id in `0..k`. The centroid of a non-empty
/// cluster is the mean of its members. A deserialized model is checked for
/// consistent shapes and finite values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKmeansFit")]
pub struct KmeansFit {
    k: usize,
    dim: usize,
    centroids: Vec<f64>,
    assignments: Vec<usize>,
    wss: f64,
    iterations: usize,
    termination: Termination,
}

#[derive(Deserialize)]
struct RawKmeansFit {
    k: usize,
    dim: usize,
    centroids: Vec<f64>,
    assignments: Vec<usize>,
    wss: f64,
    iterations: usize,
    termination: Termination,
}

impl TryFrom<RawKmeansFit> for KmeansFit {
    type Error = Error;

    fn try_from(raw: RawKmeansFit) -> Result<Self> {
        if raw.k == 0 || raw.dim == 0 {
            return Err(Error::InvalidParameter {
                name: "model",
                message: "k and dim must be at least 1",
            });
        }
        if raw.assignments.is_empty() {
            return Err(Error::EmptyInput);
        }
        let expected = raw.k.checked_mul(raw.dim).ok_or(Error::InvalidParameter {
            name: "model",
            message: "k * dim overflows",
        })?;
        if raw.centroids.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: raw.centroids.len(),
            });
        }
        if raw.assignments.iter().any(|&a| a >= raw.k) {
            return Err(Error::InvalidParameter {
                name: "assignments",
                message: "cluster id out of range 0..k",
            });
        }
        let finite = raw.centroids.iter().all(|v| v.is_finite());
        if !finite || !(raw.wss.is_finite() && raw.wss >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "model",
                message: "centroids and wss must be finite",
            });
        }
        Ok(Self {
            k: raw.k,
            dim: raw.dim,
            centroids: raw.centroids,
            assignments: raw.assignments,
            wss: raw.wss,
            iterations: raw.iterations,
            termination: raw.termination,
        })
    }
}

impl KmeansFit {
    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Feature dimension the model was fitted on.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Centroid of cluster `j`.
    ///
    /// # Panics
    ///
    /// Panics if `j >= self.k()`.
    pub fn centroid(&self, j: usize) -> &[f64] {
        &self.centroids[j * self.dim..(j + 1) * self.dim]
    }

    /// Centroids in cluster id order.
    pub fn centroids(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.centroids.chunks_exact(self.dim)
    }

    /// Cluster id of every training sample, by sample index.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Within-cluster sum of squares on the training data.
    pub fn wss(&self) -> f64 {
        self.wss
    }

    /// Number of completed Lloyd iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Why iteration stopped.
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Whether the centroid displacement dropped below the tolerance.
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Number of training samples in each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }

    /// Assign each sample of `data` to its nearest centroid.
    pub fn predict(&self, data: &Dataset) -> Result<Vec<usize>> {
        data.check_dim(self.dim)?;
        Ok(data
            .as_flat()
            .par_chunks_exact(self.dim)
            .map(|p| nearest_centroid(p, &self.centroids, self.dim).0)
            .collect())
    }
}

/// Pick the index at which the running sum of `weights` first exceeds `u * total`.
fn sample_weighted(weights: &[f64], total: f64, u: f64) -> usize {
    let target = u * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            acc += w;
            last_positive = i;
            if acc > target {
                return i;
            }
        }
    }
    last_positive
}

/// Assignment step. Returns the cost against the centroids it was given.
fn assign(data: &Dataset, centroids: &[f64], assignments: &mut [usize]) -> f64 {
    let dim = data.dim();
    let nearest: Vec<(usize, f64)> = data
        .as_flat()
        .par_chunks_exact(dim)
        .map(|p| nearest_centroid(p, centroids, dim))
        .collect();

    let mut cost = 0.0;
    for (slot, (label, d)) in assignments.iter_mut().zip(nearest) {
        *slot = label;
        cost += d;
    }
    cost
}

/// Update step: per-cluster means and member counts.
///
/// Empty clusters keep a zero centroid; the caller reseeds them.
fn update_centroids(data: &Dataset, assignments: &[usize], k: usize) -> (Vec<f64>, Vec<usize>) {
    let dim = data.dim();
    let partials: Vec<(Vec<f64>, Vec<usize>)> = data
        .as_flat()
        .par_chunks(REDUCE_CHUNK * dim)
        .zip(assignments.par_chunks(REDUCE_CHUNK))
        .map(|(rows, labels)| {
            let mut sums = vec![0.0; k * dim];
            let mut counts = vec![0usize; k];
            for (p, &label) in rows.chunks_exact(dim).zip(labels) {
                counts[label] += 1;
                for (s, x) in sums[label * dim..(label + 1) * dim].iter_mut().zip(p) {
                    *s += x;
                }
            }
            (sums, counts)
        })
        .collect();

    let mut sums = vec![0.0; k * dim];
    let mut counts = vec![0usize; k];
    for (partial_sums, partial_counts) in partials {
        for (s, p) in sums.iter_mut().zip(partial_sums) {
            *s += p;
        }
        for (c, p) in counts.iter_mut().zip(partial_counts) {
            *c += p;
        }
    }

    for (centroid, &count) in sums.chunks_exact_mut(dim).zip(&counts) {
        if count > 0 {
            let inv = 1.0 / count as f64;
            for x in centroid {
                *x *= inv;
            }
        }
    }
    (sums, counts)
}

/// Move every empty cluster's centroid onto a distinct sample, farthest-first.
///
/// Distance is measured from each sample to the centroid of its own cluster.
/// Returns the number of reseeded clusters.
fn reseed_empty(
    data: &Dataset,
    assignments: &[usize],
    sizes: &[usize],
    centroids: &mut [f64],
) -> usize {
    let empty: Vec<usize> = (0..sizes.len()).filter(|&j| sizes[j] == 0).collect();
    if empty.is_empty() {
        return 0;
    }

    let dim = data.dim();
    let mut far: Vec<(usize, f64)> = data
        .rows()
        .zip(assignments)
        .enumerate()
        .map(|(i, (p, &label))| {
            (i, squared_euclidean(p, &centroids[label * dim..(label + 1) * dim]))
        })
        .collect();
    far.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (&j, &(i, _)) in empty.iter().zip(&far) {
        centroids[j * dim..(j + 1) * dim].copy_from_slice(data.row(i));
    }
    empty.len().min(far.len())
}

fn max_displacement(old: &[f64], new: &[f64], dim: usize) -> f64 {
    old.chunks_exact(dim)
        .zip(new.chunks_exact(dim))
        .map(|(a, b)| euclidean(a, b))
        .fold(0.0, f64::max)
}

pub(crate) fn within_cluster_sum_of_squares(
    data: &Dataset,
    centroids: &[f64],
    assignments: &[usize],
) -> f64 {
    let dim = data.dim();
    data.rows()
        .zip(assignments)
        .map(|(p, &label)| squared_euclidean(p, &centroids[label * dim..(label + 1) * dim]))
        .sum()
}
