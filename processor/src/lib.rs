//! # ICG processor - deal file validation and publishing
//!
//! Loads one delimited deal file plus a two-sheet lookup workbook, runs four
//! ordered validation checks, and either publishes an enriched CSV/Parquet
//! pair or copies the untouched input into an error directory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  Deal CSV   │────▶│   Parser    │────▶│ Validation  │────▶│ Enrich +     │
//! │ + Lookup    │     │ (auto-enc)  │     │ (4 checks)  │     │ CSV/Parquet  │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └──────────────┘
//!                                                │ first failure
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  error_dir  │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use icg_processor::handle_event;
//! use serde_json::json;
//!
//! let response = handle_event(&json!({
//!     "input_dir": "incoming",
//!     "input_file": "Data.csv",
//!     "lookup_dir": "lookup",
//!     "lookup_file": "Lookup.xlsx",
//!     "error_dir": "error_dir",
//!     "csv_output_dir": "output_file_csv",
//!     "parquet_output_dir": "output_file_parquet"
//! }));
//! println!("{}", response.message);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Column names, primitive types, dataset
//! - [`config`] - Invocation event validation
//! - [`parser`] - CSV loading with auto-detection
//! - [`lookup`] - Type sheet and code sheet
//! - [`validation`] - The four ordered checks
//! - [`transform`] - Enrichment and run dispatcher
//! - [`output`] - CSV/Parquet publishing and error routing
//! - [`api`] - Response types

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Loading
pub mod parser;
pub mod lookup;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Output
pub mod output;

// Responses
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    DatasetLoadError,
    LookupLoadError,
    LoadError,
    PublishError,
    DispatchError,
    DispatchResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{columns, CodeType, Dataset, PrimitiveType};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::{RunConfig, REQUIRED_KEYS};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    load_dataset,
    parse_bytes,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
};

pub use lookup::{load_lookup, CodeEntry, LookupTable};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate,
    FailureCategory,
    ValidationFailure,
};

// =============================================================================
// Re-exports - Enrichment
// =============================================================================

pub use transform::enrich::{enrich, EnrichedDataset, EnrichedRow, PROCESS_IDENTIFIER};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    dispatch,
    dispatch_at,
    dispatch_event,
    check_file,
    handle_event,
    RunOutcome,
    RunReport,
    RunState,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{publish, route_to_error, PublishedOutputs};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{RunResponse, RunStatus, OutputPaths};
