//! Normal-Wishart posterior over K mixture atoms.
//!
//! Each cluster k carries a Normal-Wishart belief over its mean and precision:
//!
//! ```text
//! Λ_k       ~ Wishart(Ω_k, ν_k)
//! μ_k | Λ_k ~ Normal(m_k, (β_k Λ_k)⁻¹)
//! ```
//!
//! Parameters are stored as index-addressed arrays (`location[k]`,
//! `precision_scale[k]`, ...) and replaced wholesale on every update.
//!
//! # Updates
//!
//! Given weighted statistics (w_k, s_k, m̄_k, Q_k) from
//! [`SufficientStatistics`], the conjugate target is
//!
//! ```text
//! β'  = β₀ + w_k
//! m'  = (β₀ m₀ + s_k) / β'
//! ν'  = ν₀ + 1 + w_k
//! Ω'⁻¹ = Ω₀⁻¹ + Q_k + (β₀ w_k / β') (m̄_k − m₀)(m̄_k − m₀)ᵀ
//! ```
//!
//! [`NormalWishartClusters::move_natural`] blends the current parameters
//! toward that target with a pace in [0, 1]; [`NormalWishartClusters::update`]
//! is the pace = 1, repeat = 1 case.

use mixvb_math::{
    invert, is_symmetric_positive_definite, outer, MultivariateStudentT, Step, Wishart,
    LN_2PI, SYMMETRY_TOL,
};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{MixtureError, Result};
use crate::prior::BasePrior;
use crate::seeding::{seed_centers, CenterSource};
use crate::stats::{validate_data, SufficientStatistics};

/// Clusters with less weight than this are left out of debug logs.
const LOG_WEIGHT_FLOOR: f64 = 1e-9;

/// Posterior parameters of K Normal-Wishart atoms sharing one base prior.
#[derive(Debug, Clone)]
pub struct NormalWishartClusters {
    base: Arc<BasePrior>,
    location: Vec<DVector<f64>>,
    precision_scale: Vec<f64>,
    degrees_of_freedom: Vec<f64>,
    scale_matrix: Vec<DMatrix<f64>>,
    center_source: CenterSource,
    half_dimension_ln_2pi: f64,
}

/// Serializable view of one cluster's posterior.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    pub cluster: usize,
    pub location: Vec<f64>,
    pub precision_scale: f64,
    pub degrees_of_freedom: f64,
    /// Row-major D×D scale matrix.
    pub scale_matrix: Vec<Vec<f64>>,
}

/// Conjugate target for one cluster.
struct AtomTarget {
    precision_scale: f64,
    location: DVector<f64>,
    degrees_of_freedom: f64,
    scale_matrix: DMatrix<f64>,
}

impl NormalWishartClusters {
    /// Seed K atoms for a Dirichlet-process mixture.
    ///
    /// Centers come from farthest-point traversal; every atom starts with
    /// β = 1, ν = ν₀ and Ω = (Ω₀⁻¹)⁻¹, as if all points belonged to one
    /// generic cluster.
    pub fn initialize_for_unbounded<R: Rng + ?Sized>(
        base: impl Into<Arc<BasePrior>>,
        data: &[DVector<f64>],
        k: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let base = base.into();
        check_data_dimension(data, base.dimension())?;
        let (centers, source) = seed_centers(data, k, base.dimension(), None, rng)?;
        debug!(k, source = ?source, centers = ?centers, "initialized cluster centers");
        let scale = invert(base.scale_matrix_inverse())
            .map_err(|e| MixtureError::numerical(None, format!("base scale: {e}")))?;

        let nu = base.degrees_of_freedom();
        Ok(Self::from_parts(
            base,
            centers,
            vec![1.0; k],
            vec![nu; k],
            vec![scale; k],
            source,
        ))
    }

    /// Seed K atoms for a finite mixture.
    ///
    /// Centers come from `centers_file` when given (falling back to
    /// farthest-point traversal if the file does not exist), otherwise from
    /// the traversal. Every atom starts at the prior: β = β₀, ν = ν₀, Ω = Ω₀.
    pub fn initialize_for_finite<R: Rng + ?Sized>(
        base: impl Into<Arc<BasePrior>>,
        data: &[DVector<f64>],
        k: usize,
        centers_file: Option<&Path>,
        rng: &mut R,
    ) -> Result<Self> {
        let base = base.into();
        check_data_dimension(data, base.dimension())?;
        let (centers, source) = seed_centers(data, k, base.dimension(), centers_file, rng)?;
        debug!(k, source = ?source, centers = ?centers, "initialized cluster centers");

        let beta = base.precision_scale();
        let nu = base.degrees_of_freedom();
        let scale = base.scale_matrix().clone();
        Ok(Self::from_parts(
            base,
            centers,
            vec![beta; k],
            vec![nu; k],
            vec![scale; k],
            source,
        ))
    }

    fn from_parts(
        base: Arc<BasePrior>,
        location: Vec<DVector<f64>>,
        precision_scale: Vec<f64>,
        degrees_of_freedom: Vec<f64>,
        scale_matrix: Vec<DMatrix<f64>>,
        center_source: CenterSource,
    ) -> Self {
        let d = base.dimension() as f64;
        Self {
            base,
            location,
            precision_scale,
            degrees_of_freedom,
            scale_matrix,
            center_source,
            half_dimension_ln_2pi: 0.5 * d * LN_2PI,
        }
    }

    /// Batch variational update: replace every atom with its conjugate
    /// posterior given `responsibilities`.
    pub fn update(
        &mut self,
        data: &[DVector<f64>],
        responsibilities: &DMatrix<f64>,
    ) -> Result<()> {
        self.apply(data, responsibilities, 1.0, 1.0, "update")
    }

    /// Natural-gradient update for streaming or subsampled batches.
    ///
    /// The batch statistics count `repeat` times; every parameter then moves
    /// `pace` of the way from its current value toward the conjugate target.
    /// The location target divides by the target β (β₀ + w), not the blended
    /// β, so a partial pace moves the location along the straight line
    /// toward the batch posterior mean.
    pub fn move_natural(
        &mut self,
        data: &[DVector<f64>],
        responsibilities: &DMatrix<f64>,
        pace: f64,
        repeat: f64,
    ) -> Result<()> {
        self.apply(data, responsibilities, pace, repeat, "move_natural")
    }

    fn apply(
        &mut self,
        data: &[DVector<f64>],
        responsibilities: &DMatrix<f64>,
        pace: f64,
        repeat: f64,
        operation: &'static str,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&pace) {
            return Err(MixtureError::invalid(
                "pace",
                format!("must lie in [0, 1], got {pace}"),
            ));
        }
        check_data_dimension(data, self.dimension())?;
        if responsibilities.ncols() != self.k() {
            return Err(MixtureError::invalid(
                "responsibilities",
                format!(
                    "expected {} columns (one per cluster), got {}",
                    self.k(),
                    responsibilities.ncols()
                ),
            ));
        }

        let stats = SufficientStatistics::compute_scaled(data, responsibilities, repeat)?;
        trace!(cluster_mean = ?stats.cluster_mean, "{operation}: cluster means");
        trace!(quadratic_form = ?stats.quadratic_form, "{operation}: scaled quadratic forms");

        // Compute every cluster before touching state so a failure leaves the
        // previous posterior intact.
        let k = self.k();
        let mut precision_scale = Vec::with_capacity(k);
        let mut location = Vec::with_capacity(k);
        let mut degrees_of_freedom = Vec::with_capacity(k);
        let mut scale_matrix = Vec::with_capacity(k);
        for j in 0..k {
            let target = self.target(j, &stats)?;
            let omega = self.scale_matrix[j].step(&target.scale_matrix, pace);
            if !is_symmetric_positive_definite(&omega, SYMMETRY_TOL) {
                return Err(MixtureError::numerical(
                    Some(j),
                    "updated scale matrix is not symmetric positive definite",
                ));
            }
            precision_scale.push(self.precision_scale[j].step(&target.precision_scale, pace));
            location.push(self.location[j].step(&target.location, pace));
            degrees_of_freedom
                .push(self.degrees_of_freedom[j].step(&target.degrees_of_freedom, pace));
            scale_matrix.push(omega);
        }

        self.precision_scale = precision_scale;
        self.location = location;
        self.degrees_of_freedom = degrees_of_freedom;
        self.scale_matrix = scale_matrix;

        self.log_state(operation, &stats.cluster_weight);
        Ok(())
    }

    fn target(&self, k: usize, stats: &SufficientStatistics) -> Result<AtomTarget> {
        let base = &self.base;
        let beta0 = base.precision_scale();
        let weight = stats.cluster_weight[k];

        let precision_scale = beta0 + weight;
        let location = (base.location() * beta0 + &stats.weighted_sum[k]) / precision_scale;
        let degrees_of_freedom = base.degrees_of_freedom() + 1.0 + weight;

        let adjusted_mean = &stats.cluster_mean[k] - base.location();
        let shrinkage = beta0 * weight / precision_scale;
        let scale_inverse = base.scale_matrix_inverse()
            + &stats.quadratic_form[k]
            + outer(&adjusted_mean, &adjusted_mean) * shrinkage;
        let scale_matrix =
            invert(&scale_inverse).map_err(|e| MixtureError::numerical(Some(k), e))?;

        Ok(AtomTarget {
            precision_scale,
            location,
            degrees_of_freedom,
            scale_matrix,
        })
    }

    fn log_state(&self, operation: &str, cluster_weight: &[f64]) {
        for (k, &weight) in cluster_weight.iter().enumerate() {
            if weight > LOG_WEIGHT_FLOOR {
                debug!(
                    cluster = k,
                    weight,
                    location = ?self.location[k].as_slice(),
                    scale_matrix = ?self.scale_matrix[k],
                    beta = self.precision_scale[k],
                    dof = self.degrees_of_freedom[k],
                    "{operation}: cluster posterior"
                );
            }
        }
        debug!(cluster_weights = ?cluster_weight, "{operation} complete");
    }

    /// 0.5 · E[ln|Λ_k|] under each cluster's Wishart belief.
    pub fn expected_log_precision(&self) -> Result<Vec<f64>> {
        self.scale_matrix
            .iter()
            .zip(&self.degrees_of_freedom)
            .enumerate()
            .map(|(k, (omega, &nu))| {
                let wishart = Wishart::new(omega.clone(), nu)
                    .map_err(|e| MixtureError::numerical(Some(k), e))?;
                let value = 0.5 * wishart.expected_log_det();
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(MixtureError::numerical(
                        Some(k),
                        format!("expected log-determinant is not finite (dof {nu})"),
                    ))
                }
            })
            .collect()
    }

    /// Plug-in Gaussian log-likelihood of every point under every cluster
    /// (N×K):
    ///
    /// `−(D/2)·ln 2π − ½·(D/β_k + ν_k·(x − m_k)ᵀ Ω_k (x − m_k))`
    pub fn log_likelihood_fixed_precision(&self, data: &[DVector<f64>]) -> Result<DMatrix<f64>> {
        check_data_dimension(data, self.dimension())?;
        let d = self.dimension() as f64;
        let mut loglike = DMatrix::zeros(data.len(), self.k());
        for k in 0..self.k() {
            let omega = &self.scale_matrix[k];
            let beta = self.precision_scale[k];
            let nu = self.degrees_of_freedom[k];
            for (n, x) in data.iter().enumerate() {
                let diff = x - &self.location[k];
                let quad = diff.dot(&(omega * &diff));
                loglike[(n, k)] = -self.half_dimension_ln_2pi - 0.5 * (d / beta + nu * quad);
            }
        }
        Ok(loglike)
    }

    /// Posterior-predictive Student-t for every cluster.
    ///
    /// dof = ν + 1 − D and scale = (Ω · (ν + 1 − D)·β/(1 + β))⁻¹.
    pub fn predictive_distributions(&self) -> Result<Vec<MultivariateStudentT>> {
        let d = self.dimension() as f64;
        (0..self.k())
            .map(|k| {
                let beta = self.precision_scale[k];
                let dof = self.degrees_of_freedom[k] + 1.0 - d;
                let scale = dof * beta / (1.0 + beta);
                let covariance = invert(&(&self.scale_matrix[k] * scale))
                    .map_err(|e| MixtureError::numerical(Some(k), e))?;
                MultivariateStudentT::new(self.location[k].clone(), covariance, dof)
                    .map_err(|e| MixtureError::numerical(Some(k), format!("predictive: {e}")))
            })
            .collect()
    }

    /// MAP covariance per cluster: (ν_k Ω_k)⁻¹.
    pub fn map_covariances(&self) -> Result<Vec<DMatrix<f64>>> {
        self.scale_matrix
            .iter()
            .zip(&self.degrees_of_freedom)
            .enumerate()
            .map(|(k, (omega, &nu))| {
                invert(&(omega * nu)).map_err(|e| MixtureError::numerical(Some(k), e))
            })
            .collect()
    }

    /// MAP location per cluster (the posterior mean m_k).
    pub fn map_locations(&self) -> &[DVector<f64>] {
        &self.location
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.location.len()
    }

    pub fn dimension(&self) -> usize {
        self.base.dimension()
    }

    pub fn base(&self) -> &BasePrior {
        &self.base
    }

    pub fn locations(&self) -> &[DVector<f64>] {
        &self.location
    }

    pub fn precision_scales(&self) -> &[f64] {
        &self.precision_scale
    }

    pub fn degrees_of_freedom(&self) -> &[f64] {
        &self.degrees_of_freedom
    }

    pub fn scale_matrices(&self) -> &[DMatrix<f64>] {
        &self.scale_matrix
    }

    pub fn center_source(&self) -> &CenterSource {
        &self.center_source
    }

    pub fn snapshot(&self) -> Vec<ClusterSnapshot> {
        (0..self.k())
            .map(|k| ClusterSnapshot {
                cluster: k,
                location: self.location[k].iter().copied().collect(),
                precision_scale: self.precision_scale[k],
                degrees_of_freedom: self.degrees_of_freedom[k],
                scale_matrix: self.scale_matrix[k]
                    .row_iter()
                    .map(|row| row.iter().copied().collect())
                    .collect(),
            })
            .collect()
    }
}

fn check_data_dimension(data: &[DVector<f64>], dimension: usize) -> Result<()> {
    let found = validate_data(data)?;
    if found != dimension {
        return Err(MixtureError::invalid(
            "data",
            format!("points have dimension {found}, posterior has {dimension}"),
        ));
    }
    Ok(())
}
