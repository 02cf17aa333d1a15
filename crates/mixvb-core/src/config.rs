//! Fitting-session configuration.
//!
//! A JSON file describes which model to build and how streaming updates are
//! paced:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "model": "finite",
//!   "clusters": 3,
//!   "seed": 42,
//!   "centers_file": "centers.json",
//!   "streaming": { "pace": 0.5, "repeat": 10.0 }
//! }
//! ```
//!
//! Resolution order: explicit path → `MIXVB_CONFIG` → built-in defaults.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::clusters::NormalWishartClusters;
use crate::error::MixtureError;
use crate::prior::BasePrior;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable naming a configuration file.
pub const ENV_CONFIG_PATH: &str = "MIXVB_CONFIG";

const DEFAULT_CLUSTERS: usize = 2;

/// Which base prior and initialization to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Fixed K with the weak finite prior.
    #[default]
    Finite,
    /// Truncated Dirichlet-process mixture with a data-driven prior.
    Unbounded,
}

/// Natural-gradient step settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Fraction of the way to move toward the batch target, in [0, 1].
    pub pace: f64,
    /// How many times the batch counts (dataset size / batch size).
    pub repeat: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            pace: 1.0,
            repeat: 1.0,
        }
    }
}

impl StreamingConfig {
    /// Apply one natural-gradient step with these settings.
    pub fn step(
        &self,
        clusters: &mut NormalWishartClusters,
        data: &[DVector<f64>],
        responsibilities: &DMatrix<f64>,
    ) -> crate::Result<()> {
        clusters.move_natural(data, responsibilities, self.pace, self.repeat)
    }
}

/// Mixture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default = "default_clusters")]
    pub clusters: usize,
    /// RNG seed for farthest-point seeding; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// JSON center file (finite model only).
    #[serde(default)]
    pub centers_file: Option<PathBuf>,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

fn default_clusters() -> usize {
    DEFAULT_CLUSTERS
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            model: ModelKind::default(),
            clusters: DEFAULT_CLUSTERS,
            seed: None,
            centers_file: None,
            streaming: StreamingConfig::default(),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path passed by the caller.
    Explicit,
    /// Path read from `MIXVB_CONFIG`.
    Environment,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Semantic validation failures.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::VersionMismatch { .. } => 60,
            ValidationError::InvalidValue { .. } => 61,
        }
    }
}

/// Errors loading a configuration or building clusters from it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Mixture(#[from] MixtureError),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 50,
            ConfigError::Io { .. } => 51,
            ConfigError::Parse { .. } => 52,
            ConfigError::Validation(e) => e.code(),
            ConfigError::Mixture(e) => e.code(),
        }
    }
}

impl MixtureConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config = Self::from_slice(path, &contents)?;
        debug!(path = %path.display(), model = ?config.model, k = config.clusters, "loaded mixture config");
        Ok(config)
    }

    /// Parse and validate configuration content. `path` is only used for
    /// error context.
    pub fn from_slice(path: &Path, contents: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration: explicit path, then `MIXVB_CONFIG`, then
    /// defaults. A named file that does not exist is an error.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let env_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
        Self::resolve_from(explicit, env_path.as_deref())
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        let (config, source) = if let Some(path) = explicit {
            (Self::from_file(path)?, ConfigSource::Explicit)
        } else if let Some(path) = env_path {
            (Self::from_file(path)?, ConfigSource::Environment)
        } else {
            (Self::default(), ConfigSource::BuiltinDefault)
        };
        info!(source = %source, "resolved mixture config");
        Ok((config, source))
    }

    /// Semantic checks beyond what the JSON schema enforces.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(ValidationError::VersionMismatch {
                expected: CONFIG_SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }
        if self.clusters == 0 {
            return Err(ValidationError::InvalidValue {
                field: "clusters",
                message: "at least one cluster is required".to_string(),
            });
        }
        let pace = self.streaming.pace;
        if !(0.0..=1.0).contains(&pace) {
            return Err(ValidationError::InvalidValue {
                field: "streaming.pace",
                message: format!("must lie in [0, 1], got {pace}"),
            });
        }
        let repeat = self.streaming.repeat;
        if !repeat.is_finite() || repeat < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "streaming.repeat",
                message: format!("must be finite and non-negative, got {repeat}"),
            });
        }
        if self.model == ModelKind::Unbounded && self.centers_file.is_some() {
            return Err(ValidationError::InvalidValue {
                field: "centers_file",
                message: "center files only apply to the finite model".to_string(),
            });
        }
        Ok(())
    }

    /// Build the base prior and seeded clusters this configuration describes.
    pub fn initialize(&self, data: &[DVector<f64>]) -> Result<NormalWishartClusters, ConfigError> {
        self.validate()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let clusters = match self.model {
            ModelKind::Finite => {
                let dimension = data.first().map(|x| x.len()).unwrap_or(0);
                let base = BasePrior::for_finite(dimension)?;
                NormalWishartClusters::initialize_for_finite(
                    base,
                    data,
                    self.clusters,
                    self.centers_file.as_deref(),
                    &mut rng,
                )?
            }
            ModelKind::Unbounded => {
                let base = BasePrior::for_unbounded(data)?;
                NormalWishartClusters::initialize_for_unbounded(
                    base,
                    data,
                    self.clusters,
                    &mut rng,
                )?
            }
        };
        info!(
            model = ?self.model,
            k = clusters.k(),
            dimension = clusters.dimension(),
            centers = ?clusters.center_source(),
            "initialized clusters"
        );
        Ok(clusters)
    }
}
