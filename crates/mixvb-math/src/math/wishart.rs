//! Wishart belief over a precision matrix.
//!
//! Parameterization: `Λ ~ Wishart(Ω, ν)` with scale matrix Ω (D×D, SPD) and
//! degrees of freedom ν, so that `E[Λ] = ν·Ω`.

use nalgebra::DMatrix;
use thiserror::Error;

use super::linalg::{ln_det_spd, LinalgError};
use super::stable::digamma;

/// Errors constructing a Wishart belief.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WishartError {
    #[error("invalid degrees of freedom: {dof}")]
    InvalidDof { dof: f64 },
    #[error("invalid scale matrix: {0}")]
    Scale(#[from] LinalgError),
}

/// Wishart distribution over precision matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Wishart {
    scale: DMatrix<f64>,
    dof: f64,
    ln_det_scale: f64,
}

impl Wishart {
    /// Create a Wishart belief. The scale must be SPD and `dof` positive.
    ///
    /// `dof` below D − 1 is accepted: weak priors start there and the
    /// expected log-determinant stays defined off the digamma poles.
    pub fn new(scale: DMatrix<f64>, dof: f64) -> Result<Self, WishartError> {
        if !dof.is_finite() || dof <= 0.0 {
            return Err(WishartError::InvalidDof { dof });
        }
        let ln_det_scale = ln_det_spd(&scale)?;
        Ok(Self {
            scale,
            dof,
            ln_det_scale,
        })
    }

    pub fn dimension(&self) -> usize {
        self.scale.nrows()
    }

    pub fn scale(&self) -> &DMatrix<f64> {
        &self.scale
    }

    pub fn dof(&self) -> f64 {
        self.dof
    }

    /// E[ln|Λ|] = Σ_{i=1..D} ψ((ν + 1 − i)/2) + D·ln 2 + ln|Ω|
    pub fn expected_log_det(&self) -> f64 {
        let d = self.dimension();
        let digammas: f64 = (1..=d)
            .map(|i| digamma((self.dof + 1.0 - i as f64) / 2.0))
            .sum();
        digammas + d as f64 * std::f64::consts::LN_2 + self.ln_det_scale
    }

    /// E[Λ] = ν·Ω
    pub fn mean(&self) -> DMatrix<f64> {
        &self.scale * self.dof
    }
}
