//! Transformation module.
//!
//! This module turns a validated dataset into published outputs:
//! - Enrich: projection, row numbers, as-of date, lineage tag and row hash
//! - Pipeline: run dispatcher (load, validate, reject or publish)

pub mod enrich;
pub mod pipeline;

pub use enrich::*;
pub use pipeline::*;
