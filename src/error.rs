//! Error taxonomy shared by every balancer component.

use thiserror::Error;

/// Errors raised by configuration, validation, estimation, and export.
///
/// Running at a deficit is not an error: it is reported as data on the
/// allocation result.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Unknown strategy identifier, malformed source registry, or invalid config value.
    #[error("configuration error: {field}: {message}")]
    Configuration {
        /// Dotted field path (e.g. `"balancer.strategy"`).
        field: String,
        /// Human-readable constraint description.
        message: String,
    },

    /// Negative, non-finite, or inconsistent input figures.
    #[error("validation error: {0}")]
    Validation(String),

    /// An estimator could not produce a numeric result.
    #[error("estimation error: {source_name}: {message}")]
    Estimation {
        /// Estimator that failed (e.g. `"wind"`).
        source_name: String,
        /// What went wrong.
        message: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl BalanceError {
    /// Shorthand for a [`BalanceError::Configuration`].
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`BalanceError::Estimation`].
    pub fn estimation(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Estimation {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` for validation errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, BalanceError>;
