//! Run configuration.
//!
//! [`Config`] gathers every tunable of a clustering run in one explicit struct. It
//! deserializes from any serde format. Every field must be present, except that an
//! absent `silhouette_sample` means exact scoring. The [`Default`] values, for
//! programmatic use, mirror the usual notebook workflow: `k = 2`, a sweep over
//! `2..=10`, seed `1`, 20 Lloyd iterations, tolerance `1e-4`, and a 2-D PCA.

use serde::{Deserialize, Serialize};

use crate::cluster::Kmeans;
use crate::error::{Error, Result};
use crate::evaluation::{ClusterEvaluator, DistanceMeasure};
use crate::pca::Pca;
use crate::sweep::Sweep;

/// Parameters of a clustering run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Cluster count for single fits.
    pub k: usize,
    /// Smallest cluster count of a sweep.
    pub k_min: usize,
    /// Largest cluster count of a sweep (inclusive).
    pub k_max: usize,
    /// Seed of the k-means++ initialization.
    pub seed: u64,
    /// Lloyd iteration cap.
    pub max_iter: usize,
    /// Convergence threshold on centroid displacement.
    pub tolerance: f64,
    /// PCA output dimension.
    pub num_components: usize,
    /// Silhouette distance measure.
    pub distance: DistanceMeasure,
    /// Score the silhouette on this many sampled points instead of all of them.
    pub silhouette_sample: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: 2,
            k_min: 2,
            k_max: 10,
            seed: 1,
            max_iter: 20,
            tolerance: 1e-4,
            num_components: 2,
            distance: DistanceMeasure::Euclidean,
            silhouette_sample: None,
        }
    }
}

impl Config {
    /// Check the dataset-independent constraints.
    ///
    /// Bounds that depend on the data (`k <= n`, `num_components <= min(n - 1, d)`)
    /// are checked when the engines run.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if self.k_min == 0 {
            return Err(Error::InvalidParameter {
                name: "k_min",
                message: "must be at least 1",
            });
        }
        if self.k_min > self.k_max {
            return Err(Error::InvalidParameter {
                name: "k_min",
                message: "must not exceed k_max",
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
        if self.num_components == 0 {
            return Err(Error::InvalidParameter {
                name: "num_components",
                message: "must be at least 1",
            });
        }
        if self.silhouette_sample == Some(0) {
            return Err(Error::InvalidParameter {
                name: "silhouette_sample",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// K-means with `k` clusters.
    pub fn kmeans(&self) -> Kmeans {
        Kmeans::new(self.k)
            .with_seed(self.seed)
            .with_max_iter(self.max_iter)
            .with_tolerance(self.tolerance)
    }

    /// Evaluator with the configured distance and optional silhouette sampling.
    pub fn evaluator(&self) -> ClusterEvaluator {
        let evaluator = ClusterEvaluator::new().with_distance(self.distance);
        match self.silhouette_sample {
            Some(size) => evaluator.with_sample(size, self.seed),
            None => evaluator,
        }
    }

    /// Sweep over `k_min..=k_max`.
    pub fn sweep(&self) -> Sweep {
        Sweep::new(self.k_min, self.k_max)
            .with_seed(self.seed)
            .with_max_iter(self.max_iter)
            .with_tolerance(self.tolerance)
            .with_evaluator(self.evaluator())
    }

    /// PCA reducing to `num_components` dimensions.
    pub fn pca(&self) -> Pca {
        Pca::new(self.num_components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kmeans().k(), 2);
        assert_eq!(config.kmeans().seed(), 1);
    }

    #[test]
    fn test_partial_json_is_rejected() {
        let partial = r#"{ "k": 3, "tolerance": 0.001, "distance": "SquaredEuclidean" }"#;
        assert!(serde_json::from_str::<Config>(partial).is_err());
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "k": 3,
            "k_min": 2,
            "k_max": 6,
            "seed": 7,
            "max_iter": 50,
            "tolerance": 0.001,
            "num_components": 3,
            "distance": "SquaredEuclidean",
            "silhouette_sample": 500
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.k, 3);
        assert_eq!(config.k_max, 6);
        assert_eq!(config.tolerance, 0.001);
        assert_eq!(config.distance, DistanceMeasure::SquaredEuclidean);
        assert_eq!(config.silhouette_sample, Some(500));
        assert!(config.validate().is_ok());

        let round_trip: Config =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            Config {
                k: 0,
                ..Config::default()
            },
            Config {
                k_min: 5,
                k_max: 4,
                ..Config::default()
            },
            Config {
                max_iter: 0,
                ..Config::default()
            },
            Config {
                tolerance: -1.0,
                ..Config::default()
            },
            Config {
                num_components: 0,
                ..Config::default()
            },
            Config {
                silhouette_sample: Some(0),
                ..Config::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
