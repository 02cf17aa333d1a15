//! Normal-Wishart variational posterior engine.
//!
//! This library maintains the per-cluster posterior of a Gaussian mixture
//! under a Normal-Wishart conjugate prior:
//! - Base prior construction for finite and unbounded (Dirichlet-process) models
//! - Cluster seeding (farthest-point heuristic or a JSON center file)
//! - Weighted sufficient statistics from a responsibility matrix
//! - Batch and natural-gradient (streaming) posterior updates
//! - Predictive Student-t and MAP summaries
//!
//! The expectation step that produces responsibilities lives with the caller.

pub mod clusters;
pub mod config;
pub mod error;
pub mod logging;
pub mod prior;
pub mod seeding;
pub mod stats;

pub use clusters::{ClusterSnapshot, NormalWishartClusters};
pub use config::{
    ConfigError, ConfigSource, MixtureConfig, ModelKind, StreamingConfig, ValidationError,
    CONFIG_SCHEMA_VERSION,
};
pub use error::{MixtureError, Result};
pub use prior::BasePrior;
pub use seeding::{farthest_point_centers, load_centers, parse_centers, CenterSource};
pub use stats::{cluster_weights, SufficientStatistics};
