//! Multivariate Student-t distribution.
//!
//! Density with location μ, scale matrix Σ (D×D, SPD) and ν degrees of freedom:
//!
//! ```text
//! p(x) = Γ((ν+D)/2) / (Γ(ν/2) (νπ)^{D/2} |Σ|^{1/2})
//!        · (1 + (x−μ)ᵀ Σ⁻¹ (x−μ) / ν)^{−(ν+D)/2}
//! ```
//!
//! This is the posterior predictive of a Normal-Wishart model.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use std::f64::consts::PI;
use thiserror::Error;

use super::stable::log_gamma;

/// Errors constructing a Student-t distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StudentTError {
    #[error("invalid degrees of freedom: {dof}")]
    InvalidDof { dof: f64 },
    #[error("dimension mismatch: location has {location}, scale is {rows}x{cols}")]
    DimensionMismatch {
        location: usize,
        rows: usize,
        cols: usize,
    },
    #[error("scale matrix is not positive definite")]
    ScaleNotPositiveDefinite,
}

#[derive(Debug, Clone)]
pub struct MultivariateStudentT {
    location: DVector<f64>,
    scale: DMatrix<f64>,
    dof: f64,
    chol: Cholesky<f64, Dyn>,
    ln_norm: f64,
}

impl MultivariateStudentT {
    pub fn new(
        location: DVector<f64>,
        scale: DMatrix<f64>,
        dof: f64,
    ) -> Result<Self, StudentTError> {
        if !dof.is_finite() || dof <= 0.0 {
            return Err(StudentTError::InvalidDof { dof });
        }
        let d = location.len();
        if scale.nrows() != d || scale.ncols() != d {
            return Err(StudentTError::DimensionMismatch {
                location: d,
                rows: scale.nrows(),
                cols: scale.ncols(),
            });
        }
        if scale.iter().any(|v| !v.is_finite()) {
            return Err(StudentTError::ScaleNotPositiveDefinite);
        }
        let chol =
            Cholesky::new(scale.clone()).ok_or(StudentTError::ScaleNotPositiveDefinite)?;
        let half_ln_det: f64 = chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum();

        let d_f = d as f64;
        let ln_norm = log_gamma((dof + d_f) / 2.0)
            - log_gamma(dof / 2.0)
            - 0.5 * d_f * (dof * PI).ln()
            - half_ln_det;

        Ok(Self {
            location,
            scale,
            dof,
            chol,
            ln_norm,
        })
    }

    pub fn dimension(&self) -> usize {
        self.location.len()
    }

    pub fn location(&self) -> &DVector<f64> {
        &self.location
    }

    pub fn scale(&self) -> &DMatrix<f64> {
        &self.scale
    }

    pub fn dof(&self) -> f64 {
        self.dof
    }

    /// Mean, defined only for ν > 1.
    pub fn mean(&self) -> Option<&DVector<f64>> {
        (self.dof > 1.0).then_some(&self.location)
    }

    /// Covariance ν/(ν−2)·Σ, defined only for ν > 2.
    pub fn covariance(&self) -> Option<DMatrix<f64>> {
        (self.dof > 2.0).then(|| &self.scale * (self.dof / (self.dof - 2.0)))
    }

    /// Squared Mahalanobis distance (x−μ)ᵀ Σ⁻¹ (x−μ).
    pub fn mahalanobis_sq(&self, x: &DVector<f64>) -> f64 {
        if x.len() != self.dimension() {
            return f64::NAN;
        }
        let diff = x - &self.location;
        let solved = self.chol.solve(&diff);
        diff.dot(&solved)
    }

    /// Log density at `x`; NaN when `x` has the wrong dimension.
    pub fn log_density(&self, x: &DVector<f64>) -> f64 {
        let maha = self.mahalanobis_sq(x);
        if maha.is_nan() {
            return f64::NAN;
        }
        let d = self.dimension() as f64;
        self.ln_norm - 0.5 * (self.dof + d) * (maha / self.dof).ln_1p()
    }

    pub fn density(&self, x: &DVector<f64>) -> f64 {
        self.log_density(x).exp()
    }
}
