//! Immutable in-memory table of dense feature vectors.
//!
//! A [`Dataset`] holds `n` samples of dimension `d` in a single row-major buffer,
//! optionally paired with one ground-truth class label per sample. The index of a
//! sample is its identity for the lifetime of the dataset. Nothing in this crate
//! mutates a dataset after construction; projections produce a new one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dense `n x d` matrix of finite reals with optional per-sample labels.
///
/// Deserialization goes through the same checks as [`Dataset::from_flat`] and
/// [`Dataset::with_labels`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    values: Vec<f64>,
    dim: usize,
    labels: Option<Vec<usize>>,
}

#[derive(Deserialize)]
struct RawDataset {
    values: Vec<f64>,
    dim: usize,
    labels: Option<Vec<usize>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let dataset = Self::from_flat(raw.values, raw.dim)?;
        match raw.labels {
            Some(labels) => dataset.with_labels(labels),
            None => Ok(dataset),
        }
    }
}

impl Dataset {
    /// Build a dataset from one `Vec` per sample.
    ///
    /// Fails on empty input, zero-dimensional rows, ragged rows and non-finite values.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::EmptyInput);
        };
        let dim = first.len();
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }

        let mut values = Vec::with_capacity(rows.len() * dim);
        for row in &rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::from_flat(values, dim)
    }

    /// Build a dataset from a flat row-major buffer of `n * dim` values.
    pub fn from_flat(values: Vec<f64>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if values.len() % dim != 0 {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: values.len() % dim,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "features",
                message: "must be finite",
            });
        }
        Ok(Self {
            values,
            dim,
            labels: None,
        })
    }

    /// Attach ground-truth labels, one per sample.
    ///
    /// Label values are arbitrary identifiers and need not be contiguous.
    pub fn with_labels(mut self, labels: Vec<usize>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(Error::DimensionMismatch {
                expected: self.len(),
                found: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len() / self.dim
    }

    /// Always `false`: construction rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature dimension shared by every sample.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Sample `i` as a slice of length [`Dataset::dim`].
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over samples in index order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.dim)
    }

    /// Row-major backing buffer.
    pub fn as_flat(&self) -> &[f64] {
        &self.values
    }

    /// Ground-truth labels, if attached.
    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Number of distinct label values, or `None` without labels.
    pub fn num_classes(&self) -> Option<usize> {
        self.label_counts().map(|counts| counts.len())
    }

    /// `(label, sample count)` pairs in ascending label order.
    pub fn label_counts(&self) -> Option<Vec<(usize, usize)>> {
        let labels = self.labels.as_ref()?;
        let mut counts = BTreeMap::new();
        for &l in labels {
            *counts.entry(l).or_insert(0) += 1;
        }
        Some(counts.into_iter().collect())
    }

    /// Check that `other_dim` matches this dataset's feature dimension.
    pub(crate) fn check_dim(&self, other_dim: usize) -> Result<()> {
        if self.dim != other_dim {
            return Err(Error::DimensionMismatch {
                expected: other_dim,
                found: self.dim,
            });
        }
        Ok(())
    }

    /// Same labels, new feature matrix. Used by projections.
    pub(crate) fn with_values(&self, values: Vec<f64>, dim: usize) -> Self {
        Self {
            values,
            dim,
            labels: self.labels.clone(),
        }
    }
}
