/// FlightDash Errors
///
/// Two families of failure exist:
///
/// - `LoadError` is fatal. It is raised while building the Table Store or
///   reading configuration and aborts startup.
/// - `PipelineError` is recoverable. It is raised by the filter, binning and
///   aggregation stages when a caller passes parameters that cannot produce a
///   correct answer.
///
/// A filter combination that matches no rows is not an error at all: every
/// stage accepts a zero-row table and returns an empty result.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the dataset or configuration.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column '{column}' is missing from the dataset header")]
    MissingColumn { column: String },

    #[error("Row {row}: invalid value '{value}' for column '{column}': {reason}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Dataset does not form a valid table: {0}")]
    Schema(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a pipeline stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Bin width must be a positive finite number, got {0}")]
    InvalidBinWidth(f64),

    #[error("Bin boundaries must be strictly increasing: {lower} is followed by {upper}")]
    NonMonotonicBoundaries { lower: f64, upper: f64 },

    #[error("Expected {expected} bin labels, got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },

    #[error("Column '{0}' has no values to derive bin boundaries from")]
    EmptyColumn(String),

    #[error("Value {value} in column '{column}' lies below the lowest bin boundary {lowest}")]
    OutOfRange {
        column: String,
        value: f64,
        lowest: f64,
    },

    #[error("At least one group-by column is required")]
    EmptyGroupBy,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PipelineError {
    /// Returns true when the error stems from parameters the caller chose
    /// rather than from the data itself.
    pub fn is_caller_bug(&self) -> bool {
        !matches!(
            self,
            PipelineError::EmptyColumn(_) | PipelineError::OutOfRange { .. }
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
