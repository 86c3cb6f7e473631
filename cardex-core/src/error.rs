//! Core error types for Cardex.

use thiserror::Error;

/// Core error type for Cardex operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A record from the API cannot be used as-is.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
