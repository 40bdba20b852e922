//! Unit tests for error.rs
//!
//! Tests Error variants, exhaustion classification and the error macros.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_pool_exhausted_display() {
    let err = Error::PoolExhausted("out of pool memory".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Pool exhausted"));
    assert!(display.contains("out of pool memory"));
}

#[test]
fn test_not_found_display_carries_identifier() {
    let err = Error::NotFound("binding set 'camera'".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Not found"));
    assert!(display.contains("camera"));
}

#[test]
fn test_duplicate_key_display() {
    let err = Error::DuplicateKey("camera".to_string());
    assert_eq!(format!("{}", err), "Duplicate key: camera");
}

#[test]
fn test_type_mismatch_display() {
    let err = Error::TypeMismatch("slot 1 is an image".to_string());
    assert!(format!("{}", err).contains("slot 1 is an image"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("device lost".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("device lost"));
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_only_pool_exhausted_is_exhaustion() {
    assert!(Error::PoolExhausted("fragmented".to_string()).is_exhaustion());

    assert!(!Error::BackendError("device lost".to_string()).is_exhaustion());
    assert!(!Error::OutOfMemory.is_exhaustion());
    assert!(!Error::NotFound("x".to_string()).is_exhaustion());
    assert!(!Error::DuplicateKey("x".to_string()).is_exhaustion());
    assert!(!Error::TypeMismatch("x".to_string()).is_exhaustion());
    assert!(!Error::InvalidResource("x".to_string()).is_exhaustion());
    assert!(!Error::InitializationFailed("x".to_string()).is_exhaustion());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Error::NotFound("buffer handle 3".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Error::NotFound("buffer handle 4".to_string()));
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
fn test_bind_err_builds_variant() {
    let err = crate::bind_err!(NotFound, "galaxy3d::test", "handle {}", 12);
    assert_eq!(err, Error::NotFound("handle 12".to_string()));
}

#[test]
fn test_bind_bail_returns_early() {
    fn fails(flag: bool) -> Result<u32> {
        if flag {
            crate::bind_bail!(DuplicateKey, "galaxy3d::test", "key '{}'", "camera");
        }
        Ok(1)
    }

    assert_eq!(fails(false), Ok(1));
    assert_eq!(fails(true), Err(Error::DuplicateKey("key 'camera'".to_string())));
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::PoolExhausted("full".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(outer().unwrap_err().is_exhaustion());
}
