//! Invocation surface.
//!
//! This module provides the response types returned by
//! [`crate::handle_event`].

pub mod types;

pub use types::*;
