//! Error handling using `thiserror` and `anyhow`.
//!
//! This module provides both domain-specific error types for precise error
//! handling and operational error context propagation for the binary.

pub mod domain;
pub mod operational;

pub use {
    domain::{LibraryError, PlaybackError},
    operational::{ErrorReporter, ResultExt},
};
