//! Error types for basket mining operations.
//!
//! Structural problems (malformed input, bad parameters) are fatal and surface
//! before any partial computation. Numeric degeneracies during rule generation
//! are reported as [`BasketError::DegenerateRule`] and handled locally.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for basket mining operations.
///
/// # Examples
///
/// ```
/// use aprender_basket::error::BasketError;
///
/// let err = BasketError::invalid_parameter("min_support", 1.5, "in (0, 1]");
/// assert!(err.to_string().contains("min_support"));
/// ```
#[derive(Error, Debug)]
pub enum BasketError {
    /// An input record is missing a required field or carries an unparsable value.
    #[error("Malformed observation at record {record}: field '{field}': {message}")]
    MalformedObservation {
        /// 1-based record number within the input
        record: usize,
        /// Offending field name
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// A threshold or count is outside its allowed range.
    #[error("Invalid parameter: {param} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A rule whose confidence or lift would divide by zero support.
    #[error("Degenerate rule {antecedent:?} -> {consequent:?}: zero or unknown support")]
    DegenerateRule {
        /// Antecedent item identifiers
        antecedent: Vec<String>,
        /// Consequent item identifiers
        consequent: Vec<String>,
    },

    /// Nothing to mine.
    #[error("Empty input: {context}")]
    EmptyInput {
        /// Where the empty input was detected
        context: String,
    },

    /// Input file could not be opened.
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV framing error (bad quoting, ragged rows, ...).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Results could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BasketError {
    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(
        param: &str,
        value: impl std::fmt::Display,
        constraint: &str,
    ) -> Self {
        Self::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a malformed observation error.
    #[must_use]
    pub fn malformed(record: usize, field: &str, message: impl Into<String>) -> Self {
        Self::MalformedObservation {
            record,
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create an empty input error.
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput {
            context: context.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, BasketError>;
