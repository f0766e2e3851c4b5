//! Adapter result type

use super::error::AdapterError;

/// Standard result type for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
