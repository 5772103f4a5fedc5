use thiserror::Error;

/// Errors returned by the clustering, evaluation and projection routines in this crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Input dataset is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Lengths or dimensionalities that must agree do not.
    ///
    /// Raised for ragged rows, label vectors whose length differs from the sample count,
    /// and data whose feature dimension differs from the one a model was fitted on.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Requested number of principal components is out of range.
    #[error("invalid component count: requested {requested}, allowed range is 1..={max}")]
    InvalidComponentCount {
        /// Requested number of components.
        requested: usize,
        /// Largest admissible number of components, `min(n - 1, d)`.
        max: usize,
    },

    /// A decomposition could not produce a usable basis.
    #[error("singular input: {0}")]
    SingularInput(&'static str),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
