//! Cross-cutting error types for Accountable.
//!
//! Storage errors (`DatabaseError`) and configuration errors (`ConfigError`)
//! live in their own crates. This module only covers failures that can be
//! raised while handling core types.

use thiserror::Error;

/// Errors raised by core type conversions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (unknown role name, malformed identifier).
    #[error("Validation error: {0}")]
    Validation(String),
}
