//! Sweep over a range of cluster counts.
//!
//! Each `k` in `k_min..=k_max` gets an independent fit with the same seed and
//! stopping rule, followed by an evaluation. Fits share no state, so they run in
//! parallel; results always come back in ascending `k`.

use log::info;
use rayon::prelude::*;

use crate::cluster::Kmeans;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::evaluation::{ClusterEvaluator, Evaluation};

/// K-means sweep configuration.
#[derive(Clone, Debug)]
pub struct Sweep {
    k_min: usize,
    k_max: usize,
    seed: u64,
    max_iter: usize,
    tolerance: f64,
    evaluator: ClusterEvaluator,
}

impl Sweep {
    /// Sweep `k_min..=k_max` with the [`Kmeans`] defaults.
    pub fn new(k_min: usize, k_max: usize) -> Self {
        let defaults = Kmeans::new(k_min);
        Self {
            k_min,
            k_max,
            seed: defaults.seed(),
            max_iter: defaults.max_iter(),
            tolerance: defaults.tolerance(),
            evaluator: ClusterEvaluator::new(),
        }
    }

    /// Seed shared by every fit.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Lloyd iteration cap of every fit.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Convergence threshold of every fit.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Evaluator used for every `k` (distance measure, silhouette sampling).
    pub fn with_evaluator(mut self, evaluator: ClusterEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Fit and evaluate every `k`. One [`Evaluation`] per `k`, ascending.
    pub fn run(&self, data: &Dataset) -> Result<Vec<Evaluation>> {
        if self.k_min == 0 || self.k_max > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: if self.k_min == 0 { 0 } else { self.k_max },
                n_items: data.len(),
            });
        }
        if self.k_min > self.k_max {
            return Err(Error::InvalidParameter {
                name: "k_min",
                message: "must not exceed k_max",
            });
        }

        let results = (self.k_min..=self.k_max)
            .into_par_iter()
            .map(|k| {
                let fit = Kmeans::new(k)
                    .with_seed(self.seed)
                    .with_max_iter(self.max_iter)
                    .with_tolerance(self.tolerance)
                    .fit(data)?;
                let eval = self.evaluator.evaluate(data, &fit)?;
                info!(
                    "sweep k={}: silhouette {:.4}, wss {:.4}, iterations {}",
                    k,
                    eval.silhouette,
                    eval.wss,
                    fit.iterations()
                );
                Ok(eval)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(results)
    }
}

/// The evaluation with the highest silhouette; the smallest `k` wins ties.
pub fn best_by_silhouette(results: &[Evaluation]) -> Option<&Evaluation> {
    results
        .iter()
        .reduce(|best, e| if e.silhouette > best.silhouette { e } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Dataset {
        let mut rows = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)] {
            for i in 0..5 {
                let t = i as f64 * 0.1;
                rows.push(vec![cx + t, cy - t]);
            }
        }
        Dataset::new(rows).unwrap()
    }

    #[test]
    fn test_sweep_order_and_count() {
        let data = three_blobs();
        let results = Sweep::new(2, 4).with_seed(1).run(&data).unwrap();
        let ks: Vec<usize> = results.iter().map(|e| e.k).collect();
        assert_eq!(ks, vec![2, 3, 4]);
        for e in &results {
            assert!(e.wss >= 0.0);
            assert!((-1.0..=1.0).contains(&e.silhouette));
        }
    }

    #[test]
    fn test_sweep_picks_true_k() {
        let data = three_blobs();
        let results = Sweep::new(2, 5).with_seed(1).run(&data).unwrap();
        assert_eq!(best_by_silhouette(&results).map(|e| e.k), Some(3));
    }

    #[test]
    fn test_sweep_matches_individual_fits() {
        let data = three_blobs();
        let results = Sweep::new(2, 3).with_seed(9).run(&data).unwrap();
        let fit = Kmeans::new(3).with_seed(9).fit(&data).unwrap();
        assert_eq!(results[1].wss, fit.wss());
    }

    #[test]
    fn test_sweep_invalid_range() {
        let data = three_blobs();
        assert!(Sweep::new(0, 3).run(&data).is_err());
        assert!(Sweep::new(4, 3).run(&data).is_err());
        assert!(Sweep::new(2, 16).run(&data).is_err());
        assert_eq!(Sweep::new(15, 15).run(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_best_by_silhouette_empty() {
        assert!(best_by_silhouette(&[]).is_none());
    }
}
