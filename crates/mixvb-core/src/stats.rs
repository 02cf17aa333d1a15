//! Weighted sufficient statistics of a Gaussian per cluster.
//!
//! Given N points and an N×K responsibility matrix `r`, cluster k gets
//!
//! ```text
//! w_k = Σ_n r[n,k]
//! s_k = Σ_n r[n,k] · x_n
//! m_k = s_k / w_k            (s_k, i.e. zero, when w_k = 0)
//! Q_k = Σ_n r[n,k] · (x_n − m_k)(x_n − m_k)ᵀ
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::{MixtureError, Result};

/// Column sums of a responsibility matrix.
pub fn cluster_weights(responsibilities: &DMatrix<f64>) -> Vec<f64> {
    responsibilities
        .column_iter()
        .map(|column| column.sum())
        .collect()
}

/// Per-cluster weight, weighted sum, weighted mean and scatter matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistics {
    pub cluster_weight: Vec<f64>,
    pub weighted_sum: Vec<DVector<f64>>,
    pub cluster_mean: Vec<DVector<f64>>,
    pub quadratic_form: Vec<DMatrix<f64>>,
}

impl SufficientStatistics {
    /// Statistics of one pass over `data` weighted by `responsibilities`.
    pub fn compute(data: &[DVector<f64>], responsibilities: &DMatrix<f64>) -> Result<Self> {
        Self::compute_scaled(data, responsibilities, 1.0)
    }

    /// Statistics where the batch counts `repeat` times.
    ///
    /// Means are taken from the unscaled sums; weights, weighted sums and
    /// scatter matrices are multiplied by `repeat` afterwards.
    pub fn compute_scaled(
        data: &[DVector<f64>],
        responsibilities: &DMatrix<f64>,
        repeat: f64,
    ) -> Result<Self> {
        let dimension = validate_data(data)?;
        validate_responsibilities(responsibilities, data.len())?;
        if !repeat.is_finite() || repeat < 0.0 {
            return Err(MixtureError::invalid(
                "repeat",
                format!("must be finite and non-negative, got {repeat}"),
            ));
        }

        let k = responsibilities.ncols();
        let mut cluster_weight = cluster_weights(responsibilities);
        let mut weighted_sum = Vec::with_capacity(k);
        let mut cluster_mean = Vec::with_capacity(k);
        let mut quadratic_form = Vec::with_capacity(k);

        for (j, column) in responsibilities.column_iter().enumerate() {
            let mut sum = DVector::zeros(dimension);
            for (x, &r) in data.iter().zip(column.iter()) {
                if r > 0.0 {
                    sum.axpy(r, x, 1.0);
                }
            }
            let mean = if cluster_weight[j] > 0.0 {
                &sum / cluster_weight[j]
            } else {
                sum.clone()
            };

            let mut form = DMatrix::zeros(dimension, dimension);
            for (x, &r) in data.iter().zip(column.iter()) {
                if r > 0.0 {
                    let diff = x - &mean;
                    form.ger(r, &diff, &diff, 1.0);
                }
            }

            weighted_sum.push(sum);
            cluster_mean.push(mean);
            quadratic_form.push(form);
        }

        if repeat != 1.0 {
            for w in &mut cluster_weight {
                *w *= repeat;
            }
            for s in &mut weighted_sum {
                *s *= repeat;
            }
            for q in &mut quadratic_form {
                *q *= repeat;
            }
        }

        Ok(Self {
            cluster_weight,
            weighted_sum,
            cluster_mean,
            quadratic_form,
        })
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.cluster_weight.len()
    }

    /// Σ_k w_k
    pub fn total_weight(&self) -> f64 {
        self.cluster_weight.iter().sum()
    }
}

/// Check that `data` is non-empty with one consistent, finite dimension.
///
/// Returns the dimension.
pub(crate) fn validate_data(data: &[DVector<f64>]) -> Result<usize> {
    let first = data
        .first()
        .ok_or_else(|| MixtureError::invalid("data", "no data points"))?;
    let dimension = first.len();
    if dimension == 0 {
        return Err(MixtureError::invalid("data", "points have dimension 0"));
    }
    for (n, x) in data.iter().enumerate() {
        if x.len() != dimension {
            return Err(MixtureError::invalid(
                "data",
                format!("point {n} has dimension {}, expected {dimension}", x.len()),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MixtureError::invalid(
                "data",
                format!("point {n} has non-finite coordinates"),
            ));
        }
    }
    Ok(dimension)
}

fn validate_responsibilities(responsibilities: &DMatrix<f64>, n: usize) -> Result<()> {
    if responsibilities.nrows() != n {
        return Err(MixtureError::invalid(
            "responsibilities",
            format!(
                "expected {n} rows (one per point), got {}",
                responsibilities.nrows()
            ),
        ));
    }
    if responsibilities.ncols() == 0 {
        return Err(MixtureError::invalid("responsibilities", "no cluster columns"));
    }
    if let Some(bad) = responsibilities
        .iter()
        .find(|v| !v.is_finite() || **v < 0.0)
    {
        return Err(MixtureError::invalid(
            "responsibilities",
            format!("weights must be finite and non-negative, found {bad}"),
        ));
    }
    Ok(())
}
