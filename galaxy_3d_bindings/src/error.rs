//! Error types for the Galaxy3D binding layer
//!
//! Every fallible operation in this crate returns [`Result`]. Errors fall into
//! two families:
//! - programmer misuse (`NotFound`, `DuplicateKey`, `TypeMismatch`,
//!   `InvalidResource`), never recovered internally
//! - backend faults (`PoolExhausted`, `BackendError`, `OutOfMemory`,
//!   `InitializationFailed`), where only `PoolExhausted` is retried, once,
//!   inside the pool allocator

use std::fmt;

/// Result type for binding layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Binding layer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A pool cannot satisfy an allocation (out of pool memory or fragmented)
    PoolExhausted(String),

    /// Unknown key, handle or slot
    NotFound(String),

    /// A binding set is already registered under this key
    DuplicateKey(String),

    /// The resource bound at a slot is not of the expected kind
    TypeMismatch(String),

    /// Backend-specific error (device lost, driver failure, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource description or access (zero size, oversized write)
    InvalidResource(String),

    /// Initialization failed (backend, allocator)
    InitializationFailed(String),
}

impl Error {
    /// Whether the backend reported an exhaustion-class failure.
    ///
    /// Only this class is retried, and only once, by the pool allocator.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Error::PoolExhausted(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PoolExhausted(msg) => write!(f, "Pool exhausted: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::DuplicateKey(msg) => write!(f, "Duplicate key: {}", msg),
            Error::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR and build the given `Error` variant from a formatted message
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_bindings::bind_err;
///
/// let err = bind_err!(NotFound, "galaxy3d::Registry", "buffer handle {}", 7);
/// ```
#[macro_export]
macro_rules! bind_err {
    ($variant:ident, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::bind_error!($source, "{}", message);
        $crate::galaxy3d::Error::$variant(message)
    }};
}

/// Log an ERROR and return early with the given `Error` variant
#[macro_export]
macro_rules! bind_bail {
    ($variant:ident, $source:expr, $($arg:tt)*) => {
        return Err($crate::bind_err!($variant, $source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
