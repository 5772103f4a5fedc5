//! Principal component analysis.
//!
//! [`Pca::fit`] centers the data and extracts the `num_components` directions of
//! largest variance:
//!
//! - `d <= n`: eigen-decomposition of the `d x d` sample covariance matrix.
//! - `d > n`: thin SVD of the centered `n x d` sample matrix. The covariance matrix
//!   would be rank-deficient there, and the right singular vectors give the same
//!   directions without forming it.
//!
//! Variances use the unbiased `n - 1` normaliser. Each component's sign is fixed so
//! that its largest-magnitude coordinate is positive, which makes the output
//! deterministic.
//!
//! The fitted [`PcaModel`] only stores the mean and the basis, so
//! [`PcaModel::transform`] also applies to samples never seen during the fit.

use log::debug;
use nalgebra::{DMatrix, SymmetricEigen, SVD};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result};

const DECOMPOSITION_MAX_ITER: usize = 10_000;

/// PCA estimator.
#[derive(Debug, Clone)]
pub struct Pca {
    num_components: usize,
}

impl Pca {
    /// Create a PCA reducing to `num_components` dimensions.
    pub fn new(num_components: usize) -> Self {
        Self { num_components }
    }

    /// Fit the mean and principal basis of `data`.
    ///
    /// Requires `1 <= num_components <= min(n - 1, d)`.
    pub fn fit(&self, data: &Dataset) -> Result<PcaModel> {
        let n = data.len();
        let d = data.dim();
        let max = n.saturating_sub(1).min(d);
        if self.num_components == 0 || self.num_components > max {
            return Err(Error::InvalidComponentCount {
                requested: self.num_components,
                max,
            });
        }

        let mut mean = vec![0.0; d];
        for p in data.rows() {
            for (m, x) in mean.iter_mut().zip(p) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let centered = DMatrix::from_fn(n, d, |i, j| data.row(i)[j] - mean[j]);
        let denom = (n - 1) as f64;
        let total_variance = centered.norm_squared() / denom;

        let mut pairs = if d <= n {
            debug!("pca: eigen-decomposition of {}x{} covariance", d, d);
            covariance_eigen(&centered, denom)?
        } else {
            debug!("pca: thin SVD of {}x{} centered samples", n, d);
            centered_svd(centered, denom)?
        };
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
        pairs.truncate(self.num_components);

        let mut components = Vec::with_capacity(self.num_components * d);
        let mut explained_variance = Vec::with_capacity(self.num_components);
        for (value, mut vector) in pairs {
            fix_sign(&mut vector);
            explained_variance.push(value.max(0.0));
            components.extend(vector);
        }
        if components.iter().any(|x| !x.is_finite()) {
            return Err(Error::SingularInput("principal basis has non-finite entries"));
        }

        Ok(PcaModel {
            mean,
            components,
            explained_variance,
            total_variance,
        })
    }
}

/// (eigenvalue, eigenvector) pairs of the sample covariance, unsorted.
fn covariance_eigen(centered: &DMatrix<f64>, denom: f64) -> Result<Vec<(f64, Vec<f64>)>> {
    let covariance = (centered.transpose() * centered) / denom;
    let eigen = SymmetricEigen::try_new(covariance, f64::EPSILON, DECOMPOSITION_MAX_ITER)
        .ok_or(Error::SingularInput("covariance eigen-decomposition did not converge"))?;

    Ok(eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.column_iter())
        .map(|(&value, vector)| (value, vector.iter().copied().collect()))
        .collect())
}

/// (variance, right singular vector) pairs of the centered matrix, unsorted.
fn centered_svd(centered: DMatrix<f64>, denom: f64) -> Result<Vec<(f64, Vec<f64>)>> {
    let svd = SVD::try_new(centered, false, true, f64::EPSILON, DECOMPOSITION_MAX_ITER)
        .ok_or(Error::SingularInput("SVD of centered samples did not converge"))?;
    let v_t = svd
        .v_t
        .ok_or(Error::SingularInput("SVD produced no right singular vectors"))?;

    Ok(svd
        .singular_values
        .iter()
        .zip(v_t.row_iter())
        .map(|(&s, vector)| (s * s / denom, vector.iter().copied().collect()))
        .collect())
}

/// Flip `v` so its largest-magnitude coordinate is positive.
fn fix_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        for x in v {
            *x = -*x;
        }
    }
}

/// A fitted principal basis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPcaModel")]
pub struct PcaModel {
    mean: Vec<f64>,
    components: Vec<f64>,
    explained_variance: Vec<f64>,
    total_variance: f64,
}

#[derive(Deserialize)]
struct RawPcaModel {
    mean: Vec<f64>,
    components: Vec<f64>,
    explained_variance: Vec<f64>,
    total_variance: f64,
}

impl TryFrom<RawPcaModel> for PcaModel {
    type Error = Error;

    fn try_from(raw: RawPcaModel) -> Result<Self> {
        let d = raw.mean.len();
        let c = raw.explained_variance.len();
        if d == 0 {
            return Err(Error::EmptyInput);
        }
        if c == 0 || c > d {
            return Err(Error::InvalidComponentCount { requested: c, max: d });
        }
        if raw.components.len() != c * d {
            return Err(Error::DimensionMismatch {
                expected: c * d,
                found: raw.components.len(),
            });
        }
        let finite = raw
            .mean
            .iter()
            .chain(&raw.components)
            .chain(&raw.explained_variance)
            .all(|v| v.is_finite());
        if !finite || !raw.total_variance.is_finite() {
            return Err(Error::InvalidParameter {
                name: "model",
                message: "must be finite",
            });
        }
        Ok(Self {
            mean: raw.mean,
            components: raw.components,
            explained_variance: raw.explained_variance,
            total_variance: raw.total_variance,
        })
    }
}

impl PcaModel {
    /// Input feature dimension.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Output dimension.
    pub fn num_components(&self) -> usize {
        self.explained_variance.len()
    }

    /// Per-feature mean of the training data.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Component `c` as a unit vector of length [`PcaModel::dim`].
    pub fn component(&self, c: usize) -> &[f64] {
        let d = self.dim();
        &self.components[c * d..(c + 1) * d]
    }

    /// Components ordered by descending explained variance.
    pub fn components(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.components.chunks_exact(self.dim())
    }

    /// Variance along each component (the covariance eigenvalues), descending.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Fraction of the total training variance captured by each component.
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        if self.total_variance <= 0.0 {
            return vec![0.0; self.num_components()];
        }
        self.explained_variance
            .iter()
            .map(|v| v / self.total_variance)
            .collect()
    }

    /// Project `data` onto the principal basis. Labels are carried over.
    pub fn transform(&self, data: &Dataset) -> Result<Dataset> {
        data.check_dim(self.dim())?;
        let projected: Vec<Vec<f64>> = data
            .as_flat()
            .par_chunks_exact(self.dim())
            .map(|p| self.project(p))
            .collect();
        Ok(data.with_values(projected.concat(), self.num_components()))
    }

    /// Map projected samples back to the original feature space.
    ///
    /// Exact (up to rounding) when `num_components == dim`.
    pub fn inverse_transform(&self, data: &Dataset) -> Result<Dataset> {
        data.check_dim(self.num_components())?;
        let d = self.dim();
        let mut values = Vec::with_capacity(data.len() * d);
        for z in data.rows() {
            let mut x = self.mean.clone();
            for (&coef, component) in z.iter().zip(self.components()) {
                for (xi, ci) in x.iter_mut().zip(component) {
                    *xi += coef * ci;
                }
            }
            values.extend(x);
        }
        Ok(data.with_values(values, d))
    }

    fn project(&self, p: &[f64]) -> Vec<f64> {
        self.components()
            .map(|component| {
                p.iter()
                    .zip(&self.mean)
                    .zip(component)
                    .map(|((x, m), c)| (x - m) * c)
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn assert_orthonormal(model: &PcaModel) {
        for i in 0..model.num_components() {
            for j in 0..model.num_components() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(
                    dot(model.component(i), model.component(j)),
                    expected,
                    epsilon = 1e-9
                );
            }
        }
    }

    fn sample_data() -> Dataset {
        Dataset::new(vec![
            vec![2.5, 2.4, 0.5],
            vec![0.5, 0.7, 1.5],
            vec![2.2, 2.9, 0.1],
            vec![1.9, 2.2, 0.9],
            vec![3.1, 3.0, 0.3],
            vec![2.3, 2.7, 1.2],
            vec![2.0, 1.6, 0.8],
            vec![1.0, 1.1, 1.9],
        ])
        .unwrap()
    }

    #[test]
    fn test_pca_line() {
        // All points on y = 2x: one direction carries all variance.
        let data = Dataset::new(vec![
            vec![0.0, 0.0],
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 6.0],
        ])
        .unwrap();
        let model = Pca::new(2).fit(&data).unwrap();

        let s = 5.0_f64.sqrt();
        assert_abs_diff_eq!(model.component(0)[0], 1.0 / s, epsilon = 1e-9);
        assert_abs_diff_eq!(model.component(0)[1], 2.0 / s, epsilon = 1e-9);
        assert_abs_diff_eq!(model.explained_variance()[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.explained_variance_ratio()[0], 1.0, epsilon = 1e-9);
        assert_eq!(model.mean(), &[1.5, 3.0]);
    }

    #[test]
    fn test_pca_orthonormal_and_sorted() {
        let model = Pca::new(3).fit(&sample_data()).unwrap();
        assert_orthonormal(&model);

        let ev = model.explained_variance();
        assert!(ev.windows(2).all(|w| w[0] >= w[1]));
        assert!(ev.iter().all(|&v| v >= 0.0));
        assert_abs_diff_eq!(
            model.explained_variance_ratio().iter().sum::<f64>(),
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_pca_wide_data_uses_svd() {
        // d > n
        let data = Dataset::new(vec![
            vec![1.0, 0.0, 2.0, 0.5, -1.0],
            vec![0.0, 1.0, 0.0, 1.5, 2.0],
            vec![3.0, 1.0, 1.0, 0.0, 0.0],
            vec![-1.0, 2.0, 0.5, 1.0, 1.0],
        ])
        .unwrap();
        let model = Pca::new(3).fit(&data).unwrap();
        assert_eq!(model.num_components(), 3);
        assert_orthonormal(&model);
        assert!(model.explained_variance().windows(2).all(|w| w[0] >= w[1]));

        let projected = model.transform(&data).unwrap();
        assert_eq!(projected.dim(), 3);
        assert_eq!(projected.len(), 4);
    }

    #[test]
    fn test_pca_variance_matches_projection() {
        let data = sample_data();
        let model = Pca::new(2).fit(&data).unwrap();
        let projected = model.transform(&data).unwrap();

        for c in 0..2 {
            let values: Vec<f64> = projected.rows().map(|z| z[c]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (values.len() - 1) as f64;
            assert_abs_diff_eq!(var, model.explained_variance()[c], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pca_invalid_component_count() {
        let data = sample_data();
        assert_eq!(
            Pca::new(0).fit(&data).unwrap_err(),
            Error::InvalidComponentCount {
                requested: 0,
                max: 3
            }
        );
        assert!(Pca::new(4).fit(&data).is_err());

        let single = Dataset::new(vec![vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            Pca::new(1).fit(&single).unwrap_err(),
            Error::InvalidComponentCount {
                requested: 1,
                max: 0
            }
        );
    }

    #[test]
    fn test_pca_transform_unseen_data_and_labels() {
        let model = Pca::new(2).fit(&sample_data()).unwrap();
        let unseen = Dataset::new(vec![vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]])
            .unwrap()
            .with_labels(vec![1, 0])
            .unwrap();
        let projected = model.transform(&unseen).unwrap();
        assert_eq!(projected.dim(), 2);
        assert_eq!(projected.labels(), Some(&[1, 0][..]));

        let wrong = Dataset::new(vec![vec![1.0, 1.0]]).unwrap();
        assert!(model.transform(&wrong).is_err());
    }

    #[test]
    fn test_model_json_round_trip() {
        let model = Pca::new(2).fit(&sample_data()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: PcaModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_model_json_rejects_inconsistent_shapes() {
        let invalid = [
            // two components declared, one stored
            r#"{"mean":[0.0,0.0],"components":[1.0,0.0],"explained_variance":[2.0,1.0],"total_variance":3.0}"#,
            // no features
            r#"{"mean":[],"components":[],"explained_variance":[],"total_variance":0.0}"#,
            // more components than features
            r#"{"mean":[0.0],"components":[1.0,1.0],"explained_variance":[1.0,1.0],"total_variance":2.0}"#,
        ];
        for json in invalid {
            assert!(serde_json::from_str::<PcaModel>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_fix_sign() {
        let mut v = vec![0.1, -0.9, 0.3];
        fix_sign(&mut v);
        assert_eq!(v, vec![-0.1, 0.9, -0.3]);
    }
}
