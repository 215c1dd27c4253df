//! Error types for the ICG deal-file processor.
//!
//! This module defines one error type per failure concern:
//!
//! - [`ConfigError`] - Invocation keys missing or malformed
//! - [`DatasetLoadError`] - Input CSV missing or unparseable
//! - [`LookupLoadError`] - Reference lookup missing or malformed
//! - [`PublishError`] - Writing outputs or routing to the error directory failed
//! - [`DispatchError`] - Top-level run errors
//!
//! Content-validation failures are not errors: they are a normal terminal
//! outcome of a run, see [`crate::validation::ValidationFailure`].

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while turning an invocation event into a [`crate::config::RunConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The event is not a JSON object.
    #[error("Invocation event must be a JSON object")]
    NotAnObject,

    /// A required key is absent.
    #[error("Missing required key: {0}")]
    MissingKey(&'static str),

    /// A key is present but has the wrong shape.
    #[error("Invalid value for key '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },

    /// Failed to read an event file.
    #[error("Failed to read event file: {0}")]
    IoError(#[from] std::io::Error),

    /// Event file is not valid JSON.
    #[error("Invalid event JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading the input dataset.
#[derive(Debug, Error)]
pub enum DatasetLoadError {
    /// Input file could not be read.
    #[error("Failed to read dataset '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Empty file.
    #[error("Dataset is empty")]
    EmptyFile,

    /// No header row.
    #[error("No headers found in dataset")]
    NoHeaders,

    /// Same column name appears twice in the header.
    #[error("Duplicate column in header: {0}")]
    DuplicateColumn(String),

    /// A data row has more fields than the header.
    #[error("Line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Delimiter is not a single-byte ASCII character.
    #[error("Delimiter must be an ASCII character, got '{0}'")]
    InvalidDelimiter(char),

    /// Malformed delimited content.
    #[error("Invalid CSV content: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors while loading the reference lookup.
#[derive(Debug, Error)]
pub enum LookupLoadError {
    /// Lookup file could not be read.
    #[error("Failed to read lookup '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook could not be opened or read.
    #[error("Failed to read lookup workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// JSON lookup document is invalid.
    #[error("Invalid lookup JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is not a supported lookup format.
    #[error("Unsupported lookup format: {0}")]
    UnsupportedFormat(String),

    /// A required sheet is missing.
    #[error("Lookup sheet {0} is missing")]
    MissingSheet(usize),

    /// Sheet 0 has no data row after its header.
    #[error("Type sheet has no type definition row")]
    EmptyTypeSheet,

    /// A type name is not one of str, int, float, bool.
    #[error("Unknown type '{type_name}' declared for column '{column}'")]
    UnknownType { column: String, type_name: String },

    /// Code sheet lacks a required column.
    #[error("Code sheet is missing column '{0}'")]
    MissingColumn(&'static str),

    /// Code sheet row carries a Type outside Country/Currency/Company.
    #[error("Code sheet row {row}: unknown code type '{value}'")]
    UnknownCodeType { row: usize, value: String },
}

/// Top-level load error, fatal for a run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Dataset load failed: {0}")]
    Dataset(#[from] DatasetLoadError),

    #[error("Lookup load failed: {0}")]
    Lookup(#[from] LookupLoadError),
}

// =============================================================================
// Publish Errors
// =============================================================================

/// Errors while writing outputs or routing a rejected file.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Filesystem failure on a given path.
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Arrow batch construction failed.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Parquet encoding failed.
    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Input file name has no usable stem.
    #[error("Cannot derive output name from '{0}'")]
    InvalidFileName(String),
}

impl PublishError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Dispatch Errors (top-level)
// =============================================================================

/// Fatal run errors returned by [`crate::transform::pipeline::dispatch`].
///
/// Validation failures never appear here; they end the run with
/// [`crate::transform::pipeline::RunOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input or lookup load error.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// Output error.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl From<DatasetLoadError> for DispatchError {
    fn from(err: DatasetLoadError) -> Self {
        Self::Load(err.into())
    }
}

impl From<LookupLoadError> for DispatchError {
    fn from(err: LookupLoadError) -> Self {
        Self::Load(err.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration parsing.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for dataset loading.
pub type DatasetResult<T> = Result<T, DatasetLoadError>;

/// Result type for lookup loading.
pub type LookupResult<T> = Result<T, LookupLoadError>;

/// Result type for publishing.
pub type PublishResult<T> = Result<T, PublishError>;

/// Result type for a whole run.
pub type DispatchResult<T> = Result<T, DispatchError>;
