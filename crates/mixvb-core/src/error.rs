//! Error types for the mixture engine.

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MixtureError>;

/// Errors raised by posterior initialization, updates and summaries.
#[derive(Debug, Error)]
pub enum MixtureError {
    #[error("invalid input for {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("numerical failure{}: {message}", cluster_suffix(.cluster))]
    NumericalFailure {
        cluster: Option<usize>,
        message: String,
    },

    #[error("center file not found: {path}")]
    MissingResource { path: PathBuf },

    #[error("I/O error reading center file {path}: {source}")]
    CenterFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in center file {path}: {source}")]
    CenterFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl MixtureError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        MixtureError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn numerical(cluster: Option<usize>, message: impl Display) -> Self {
        MixtureError::NumericalFailure {
            cluster,
            message: message.to_string(),
        }
    }

    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            MixtureError::InvalidInput { .. } => 10,
            MixtureError::NumericalFailure { .. } => 20,
            MixtureError::MissingResource { .. } => 30,
            MixtureError::CenterFileIo { .. } => 31,
            MixtureError::CenterFileParse { .. } => 32,
        }
    }

    /// True for singular or non-SPD matrices the caller may regularize and retry.
    pub fn is_numerical(&self) -> bool {
        matches!(self, MixtureError::NumericalFailure { .. })
    }
}

fn cluster_suffix(cluster: &Option<usize>) -> String {
    match cluster {
        Some(k) => format!(" in cluster {k}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cluster_index() {
        let err = MixtureError::numerical(Some(3), "matrix is singular");
        assert_eq!(
            err.to_string(),
            "numerical failure in cluster 3: matrix is singular"
        );
        let err = MixtureError::numerical(None, "matrix is singular");
        assert_eq!(err.to_string(), "numerical failure: matrix is singular");
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            MixtureError::invalid("data", "empty"),
            MixtureError::numerical(None, "x"),
            MixtureError::MissingResource {
                path: PathBuf::from("centers.json"),
            },
        ];
        let codes: Vec<u32> = errors.iter().map(MixtureError::code).collect();
        assert_eq!(codes, vec![10, 20, 30]);
        assert!(errors[1].is_numerical());
        assert!(!errors[0].is_numerical());
    }
}
