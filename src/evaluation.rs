//! Clustering quality: within-cluster sum of squares and silhouette.
//!
//! ## Silhouette
//!
//! For sample `i` in cluster `C`:
//!
//! ```text
//! a(i) = mean distance from i to the other members of C
//! b(i) = min over C' != C of the mean distance from i to C'
//! s(i) = (b(i) - a(i)) / max(a(i), b(i))                      (0 if both are 0)
//! ```
//!
//! A sample alone in its cluster has `s(i) = 0`.
//!
//! The score is the mean of `s(i)`. It lies in `[-1, 1]`; values near 1 mean compact,
//! well-separated clusters. A clustering with fewer than two non-empty clusters has
//! no `b(i)` and scores 0.
//!
//! ## Scalability
//!
//! The exact score needs every pairwise distance: O(n² d) time. This is the
//! dominant cost of a sweep for a few thousand samples and up. For larger inputs,
//! [`ClusterEvaluator::with_sample`] scores a seeded random subset of samples (each
//! still compared against the whole dataset), which is O(m n d) for `m` sampled
//! points and gives an unbiased estimate of the mean.

use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::util::{euclidean, squared_euclidean};
use crate::cluster::KmeansFit;
use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Point-to-point distance used by the silhouette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMeasure {
    /// Plain Euclidean distance.
    #[default]
    Euclidean,
    /// Squared Euclidean distance.
    SquaredEuclidean,
}

impl DistanceMeasure {
    #[inline]
    fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMeasure::Euclidean => euclidean(a, b),
            DistanceMeasure::SquaredEuclidean => squared_euclidean(a, b),
        }
    }
}

/// Quality metrics of one fitted model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Number of clusters of the evaluated model.
    pub k: usize,
    /// Mean silhouette, in `[-1, 1]`.
    pub silhouette: f64,
    /// Within-cluster sum of squares, `>= 0`.
    pub wss: f64,
    /// Whether the fit reached its tolerance.
    pub converged: bool,
}

#[derive(Clone, Copy, Debug)]
struct Sampling {
    size: usize,
    seed: u64,
}

/// Computes [`Evaluation`]s. Stateless apart from its options.
#[derive(Clone, Debug, Default)]
pub struct ClusterEvaluator {
    distance: DistanceMeasure,
    sampling: Option<Sampling>,
}

impl ClusterEvaluator {
    /// Exact silhouette with Euclidean distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the silhouette distance measure.
    pub fn with_distance(mut self, distance: DistanceMeasure) -> Self {
        self.distance = distance;
        self
    }

    /// Approximate the silhouette from `size` samples drawn with `seed`.
    ///
    /// Has no effect when `size >= n`.
    pub fn with_sample(mut self, size: usize, seed: u64) -> Self {
        self.sampling = Some(Sampling { size, seed });
        self
    }

    /// Within-cluster sum of squares of `fit` on `data`.
    pub fn wss(&self, data: &Dataset, fit: &KmeansFit) -> Result<f64> {
        check_fit(data, fit)?;
        Ok(data
            .rows()
            .zip(fit.assignments())
            .map(|(p, &label)| squared_euclidean(p, fit.centroid(label)))
            .sum())
    }

    /// Mean silhouette of the partition `fit` induces on `data`.
    pub fn silhouette(&self, data: &Dataset, fit: &KmeansFit) -> Result<f64> {
        check_fit(data, fit)?;
        self.silhouette_score(data, fit.assignments())
    }

    /// Mean silhouette of an arbitrary labelling of `data`.
    pub fn silhouette_score(&self, data: &Dataset, labels: &[usize]) -> Result<f64> {
        let n = data.len();
        if labels.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: labels.len(),
            });
        }
        if self.sampling.is_some_and(|s| s.size == 0) {
            return Err(Error::InvalidParameter {
                name: "sample_size",
                message: "must be at least 1",
            });
        }

        // Rank cluster ids; the values themselves may be sparse.
        let mut ids = labels.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() < 2 {
            return Ok(0.0);
        }
        let dense: Vec<usize> = labels
            .iter()
            .map(|l| ids.partition_point(|id| id < l))
            .collect();
        let mut sizes = vec![0usize; ids.len()];
        for &c in &dense {
            sizes[c] += 1;
        }

        let indices: Vec<usize> = match self.sampling {
            Some(s) if s.size < n => {
                let mut rng = StdRng::seed_from_u64(s.seed);
                let mut picked = rand::seq::index::sample(&mut rng, n, s.size).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n).collect(),
        };

        let scores: Vec<f64> = indices
            .par_iter()
            .map(|&i| self.sample_silhouette(data, &dense, &sizes, i))
            .collect();
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Silhouette and WSS of `fit` on `data`.
    pub fn evaluate(&self, data: &Dataset, fit: &KmeansFit) -> Result<Evaluation> {
        Ok(Evaluation {
            k: fit.k(),
            silhouette: self.silhouette(data, fit)?,
            wss: self.wss(data, fit)?,
            converged: fit.converged(),
        })
    }

    fn sample_silhouette(&self, data: &Dataset, labels: &[usize], sizes: &[usize], i: usize) -> f64 {
        let own = labels[i];
        if sizes[own] == 1 {
            return 0.0;
        }
        let p = data.row(i);

        let mut sums = vec![0.0; sizes.len()];
        for (j, (q, &l)) in data.rows().zip(labels).enumerate() {
            if j != i {
                sums[l] += self.distance.distance(p, q);
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = sums
            .iter()
            .zip(sizes)
            .enumerate()
            .filter(|&(c, _)| c != own)
            .map(|(_, (&sum, &size))| sum / size as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            (b - a) / denom
        } else {
            0.0
        }
    }
}

/// Exact Euclidean silhouette of a labelling.
pub fn silhouette_score(data: &Dataset, labels: &[usize]) -> Result<f64> {
    ClusterEvaluator::new().silhouette_score(data, labels)
}

fn check_fit(data: &Dataset, fit: &KmeansFit) -> Result<()> {
    data.check_dim(fit.dim())?;
    if fit.assignments().len() != data.len() {
        return Err(Error::DimensionMismatch {
            expected: fit.assignments().len(),
            found: data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Kmeans;
    use approx::assert_abs_diff_eq;

    fn two_clusters() -> Dataset {
        Dataset::new(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
            vec![11.0, 10.0],
            vec![11.0, 11.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_silhouette_well_separated() {
        let data = two_clusters();
        let score = silhouette_score(&data, &[0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        assert!(score > 0.9, "well-separated clusters should score high: {score}");
    }

    #[test]
    fn test_silhouette_poor_clustering() {
        let data = two_clusters();
        let score = silhouette_score(&data, &[0, 1, 0, 1, 0, 1, 0, 1]).unwrap();
        assert!(score < 0.1, "interleaved labels should score low: {score}");
        assert!(score >= -1.0);
    }

    #[test]
    fn test_silhouette_hand_computed() {
        // 1-D: {0, 2} and {10}.
        let data = Dataset::new(vec![vec![0.0], vec![2.0], vec![10.0]]).unwrap();
        let score = silhouette_score(&data, &[0, 0, 1]).unwrap();
        // s(0) = (10 - 2) / 10, s(1) = (8 - 2) / 8, s(2) = 0 (singleton)
        let expected = (0.8 + 0.75 + 0.0) / 3.0;
        assert_abs_diff_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_silhouette_squared_distance() {
        let data = Dataset::new(vec![vec![0.0], vec![2.0], vec![10.0]]).unwrap();
        let score = ClusterEvaluator::new()
            .with_distance(DistanceMeasure::SquaredEuclidean)
            .silhouette_score(&data, &[0, 0, 1])
            .unwrap();
        // s(0) = (100 - 4) / 100, s(1) = (64 - 4) / 64
        let expected = (0.96 + 0.9375) / 3.0;
        assert_abs_diff_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_silhouette_single_cluster_is_zero() {
        let data = two_clusters();
        assert_eq!(silhouette_score(&data, &[0; 8]).unwrap(), 0.0);
    }

    #[test]
    fn test_silhouette_ignores_label_values() {
        let data = two_clusters();
        let dense = silhouette_score(&data, &[0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        let big = usize::MAX;
        let sparse = silhouette_score(&data, &[9, 9, 9, 9, big, big, big, big]).unwrap();
        assert_eq!(dense, sparse);
    }

    #[test]
    fn test_silhouette_label_length_mismatch() {
        let data = two_clusters();
        assert!(silhouette_score(&data, &[0, 1]).is_err());
    }

    #[test]
    fn test_silhouette_sampled_close_to_exact() {
        let data = two_clusters();
        let labels = [0, 0, 0, 0, 1, 1, 1, 1];
        let exact = silhouette_score(&data, &labels).unwrap();
        let sampled = ClusterEvaluator::new()
            .with_sample(4, 9)
            .silhouette_score(&data, &labels)
            .unwrap();
        assert!((exact - sampled).abs() < 0.05);

        let full = ClusterEvaluator::new()
            .with_sample(100, 9)
            .silhouette_score(&data, &labels)
            .unwrap();
        assert_eq!(full, exact);

        assert!(ClusterEvaluator::new()
            .with_sample(0, 9)
            .silhouette_score(&data, &labels)
            .is_err());
    }

    #[test]
    fn test_evaluate_matches_fit() {
        let data = two_clusters();
        let fit = Kmeans::new(2).with_seed(3).fit(&data).unwrap();
        let eval = ClusterEvaluator::new().evaluate(&data, &fit).unwrap();
        assert_eq!(eval.k, 2);
        assert!(eval.converged);
        assert_abs_diff_eq!(eval.wss, fit.wss(), epsilon = 1e-9);
        // Four unit squares: every point is at squared distance 0.5 from its centroid.
        assert_abs_diff_eq!(eval.wss, 4.0, epsilon = 1e-9);
        assert!(eval.silhouette > 0.9);
    }

    #[test]
    fn test_evaluate_rejects_other_dataset() {
        let data = two_clusters();
        let fit = Kmeans::new(2).with_seed(3).fit(&data).unwrap();
        let other = Dataset::new(vec![vec![0.0, 0.0]]).unwrap();
        assert!(ClusterEvaluator::new().evaluate(&other, &fit).is_err());
        let wider = Dataset::new(vec![vec![0.0, 0.0, 0.0]; 8]).unwrap();
        assert!(ClusterEvaluator::new().wss(&wider, &fit).is_err());
    }
}
