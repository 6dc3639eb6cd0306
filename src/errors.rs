use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AppConfigError;

/// Errors raised while manufacturing a dataset.
///
/// Every variant is fatal: generation aborts and nothing is persisted.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Configuration error: `{parameter}` {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("Missing FX rate for {date} while assembling {context}")]
    MissingRate { date: NaiveDate, context: String },

    #[error("Integrity violation [{invariant}]: {detail}")]
    IntegrityViolation {
        invariant: &'static str,
        detail: String,
    },
}

impl GenerationError {
    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn integrity(invariant: &'static str, detail: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            invariant,
            detail: detail.into(),
        }
    }
}

/// FX lookup failures raised by the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum ConversionError {
    #[error("No FX rate loaded for {date}")]
    UnknownDate { date: NaiveDate },

    #[error("FX rate {rate} on {date} is not positive")]
    InvalidRate {
        date: NaiveDate,
        rate: rust_decimal::Decimal,
    },
}

/// Errors raised by the table codec and the table directory.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table `{table}`: {reason}")]
    Malformed { table: String, reason: String },

    #[error("Schema mismatch in `{table}`: {reason}")]
    SchemaMismatch { table: String, reason: String },

    #[error("Value `{value}` does not fit column {table}.{column}")]
    Overflow {
        table: String,
        column: String,
        value: String,
    },

    #[error("Failed to persist table `{table}`: {source}")]
    Persist {
        table: String,
        #[source]
        source: tempfile::PersistError,
    },
}

impl TableError {
    pub fn malformed(table: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub fn schema(table: &str, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

/// Umbrella error for callers driving the whole pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] AppConfigError),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("Dataset already present at {0}; pass --force to regenerate")]
    DatasetExists(String),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
