//! Clustering algorithms for grouping similar samples.
//!
//! ## K-means
//!
//! The classic algorithm: assign each point to the nearest centroid, then
//! update centroids to the mean of their points. Repeat.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You know k in advance (or sweep it, see [`crate::sweep`])
//!
//! Cluster ids carry no meaning of their own. Use [`crate::alignment`] to map them
//! onto known labels.
//!
//! ## Usage
//!
//! ```rust
//! use kclust::cluster::{Clustering, Kmeans};
//! use kclust::Dataset;
//!
//! let data = Dataset::new(vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ])
//! .unwrap();
//!
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);  // First two together
//! assert_ne!(labels[0], labels[2]);  // Separate from last two
//! ```

mod kmeans;
mod traits;
pub(crate) mod util;

pub use kmeans::{Kmeans, KmeansFit, Termination};
pub use traits::Clustering;
