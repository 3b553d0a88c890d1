//! Error types for the ring cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the ring cache.
///
/// A missing key is not an error; lookups report it through
/// [`Lookup::Miss`](crate::cache::Lookup::Miss).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction parameters or configuration values are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == Result Type Alias ==
/// Convenience Result type for the ring cache.
pub type Result<T> = std::result::Result<T, CacheError>;
