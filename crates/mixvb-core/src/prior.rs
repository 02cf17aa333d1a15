//! Shared Normal-Wishart base distribution.
//!
//! Every cluster's posterior is conjugate to this prior. It is built once per
//! fitting session and never mutated; clusters hold it behind an `Arc`.

use mixvb_math::{bounding_box, invert, is_symmetric_positive_definite, SYMMETRY_TOL};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{MixtureError, Result};
use crate::stats::validate_data;

/// Degrees of freedom of the weak prior used for finite mixtures.
pub const FINITE_DEGREES_OF_FREEDOM: f64 = 0.1;
/// Precision scale of the weak prior used for finite mixtures.
pub const FINITE_PRECISION_SCALE: f64 = 0.1;

/// Normal-Wishart hyperparameters (ν₀, Ω₀, Ω₀⁻¹, β₀, m₀).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasePrior {
    degrees_of_freedom: f64,
    scale_matrix: DMatrix<f64>,
    scale_matrix_inverse: DMatrix<f64>,
    precision_scale: f64,
    location: DVector<f64>,
}

impl BasePrior {
    /// Build a prior from explicit hyperparameters.
    ///
    /// `scale_matrix` must be SPD; `degrees_of_freedom` and `precision_scale`
    /// must be finite and positive.
    pub fn new(
        degrees_of_freedom: f64,
        scale_matrix: DMatrix<f64>,
        precision_scale: f64,
        location: DVector<f64>,
    ) -> Result<Self> {
        if !degrees_of_freedom.is_finite() || degrees_of_freedom <= 0.0 {
            return Err(MixtureError::invalid(
                "degrees_of_freedom",
                format!("must be finite and positive, got {degrees_of_freedom}"),
            ));
        }
        if !precision_scale.is_finite() || precision_scale <= 0.0 {
            return Err(MixtureError::invalid(
                "precision_scale",
                format!("must be finite and positive, got {precision_scale}"),
            ));
        }
        let d = location.len();
        if d == 0 {
            return Err(MixtureError::invalid("location", "dimension must be positive"));
        }
        if scale_matrix.shape() != (d, d) {
            return Err(MixtureError::invalid(
                "scale_matrix",
                format!(
                    "expected {d}x{d}, got {}x{}",
                    scale_matrix.nrows(),
                    scale_matrix.ncols()
                ),
            ));
        }
        if location.iter().any(|v| !v.is_finite()) {
            return Err(MixtureError::invalid("location", "non-finite coordinates"));
        }
        if !is_symmetric_positive_definite(&scale_matrix, SYMMETRY_TOL) {
            return Err(MixtureError::numerical(
                None,
                "base scale matrix is not symmetric positive definite",
            ));
        }
        let scale_matrix_inverse =
            invert(&scale_matrix).map_err(|e| MixtureError::numerical(None, e))?;

        Ok(Self {
            degrees_of_freedom,
            scale_matrix,
            scale_matrix_inverse,
            precision_scale,
            location,
        })
    }

    /// Data-driven prior for a Dirichlet-process (unbounded) mixture.
    ///
    /// ν₀ = D, β₀ = R⁻² for the widest bounding-box side R, Ω₀⁻¹ = I, and m₀
    /// at `min + width` on every axis: the far corner of the bounding box.
    /// Data whose points all coincide (a zero-width bounding box) is
    /// rejected with `InvalidInput`.
    pub fn for_unbounded(data: &[DVector<f64>]) -> Result<Self> {
        let dimension = validate_data(data)?;
        let bounds = bounding_box(data)
            .ok_or_else(|| MixtureError::invalid("data", "cannot compute bounding box"))?;

        let widths: Vec<f64> = bounds.iter().map(|(lo, hi)| hi - lo).collect();
        let widest = widths.iter().cloned().fold(0.0, f64::max);
        if widest <= 0.0 {
            return Err(MixtureError::invalid(
                "data",
                "all points coincide; bounding box has zero width",
            ));
        }

        // Offset by the full width, not half of it. Fitted models depend on
        // this placement.
        let location = DVector::from_iterator(
            dimension,
            bounds.iter().zip(&widths).map(|((lo, _), w)| lo + w),
        );

        Self::new(
            dimension as f64,
            DMatrix::identity(dimension, dimension),
            widest.powi(-2),
            location,
        )
    }

    /// Fixed weak prior for a finite mixture: ν₀ = β₀ = 0.1, m₀ = 0, Ω₀ = I.
    pub fn for_finite(dimension: usize) -> Result<Self> {
        Self::new(
            FINITE_DEGREES_OF_FREEDOM,
            DMatrix::identity(dimension, dimension),
            FINITE_PRECISION_SCALE,
            DVector::zeros(dimension),
        )
    }

    pub fn dimension(&self) -> usize {
        self.location.len()
    }

    pub fn degrees_of_freedom(&self) -> f64 {
        self.degrees_of_freedom
    }

    pub fn scale_matrix(&self) -> &DMatrix<f64> {
        &self.scale_matrix
    }

    pub fn scale_matrix_inverse(&self) -> &DMatrix<f64> {
        &self.scale_matrix_inverse
    }

    pub fn precision_scale(&self) -> f64 {
        self.precision_scale
    }

    pub fn location(&self) -> &DVector<f64> {
        &self.location
    }
}
