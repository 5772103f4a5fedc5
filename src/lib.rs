//! K-means clustering and clustering diagnostics for dense vectors.
//!
//! `kclust` clusters an in-memory [`Dataset`] into `k` groups and measures how good
//! that grouping is:
//! - [`cluster`]: k-means (seeded k-means++ start, Lloyd iterations)
//! - [`evaluation`]: within-cluster sum of squares and silhouette
//! - [`pca`]: principal component projection
//! - [`alignment`]: mapping cluster ids onto ground-truth labels
//! - [`sweep`]: fitting and scoring a range of `k`
//!
//! All inputs are immutable and every operation returns a new value.
//!
//! ```rust
//! use kclust::{align, ClusterEvaluator, Dataset, Kmeans};
//!
//! let data = Dataset::new(vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 0.0],
//!     vec![10.0, 1.0],
//! ])
//! .unwrap()
//! .with_labels(vec![1, 1, 0, 0])
//! .unwrap();
//!
//! let fit = Kmeans::new(2).with_seed(1).fit(&data).unwrap();
//! assert!((fit.wss() - 1.0).abs() < 1e-9);
//!
//! let eval = ClusterEvaluator::new().evaluate(&data, &fit).unwrap();
//! assert!(eval.silhouette > 0.8);
//!
//! let alignment = align(&fit, data.labels().unwrap()).unwrap();
//! assert_eq!(alignment.matches, 4);
//! ```

#![forbid(unsafe_code)]

pub mod alignment;
pub mod cluster;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod pca;
pub mod sweep;

pub use alignment::{align, align_assignments, Alignment};
pub use cluster::{Clustering, Kmeans, KmeansFit, Termination};
pub use config::Config;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use evaluation::{silhouette_score, ClusterEvaluator, DistanceMeasure, Evaluation};
pub use pca::{Pca, PcaModel};
pub use sweep::{best_by_silhouette, Sweep};
