//! Error Types
//!
//! This module defines the error types returned by the caches.
//!
//! # Overview
//!
//! Only *environmental* failures are represented here: the device collaborator
//! refusing or failing to create an object, or a packed state the backend has
//! no way to express. A failed creation never leaves a partial entry behind;
//! the cache is exactly as it was before the lookup.
//!
//! Contract violations (packed field overflow, unbalanced reference-count
//! release, destroying a binding-set cache that still holds entries) are bugs
//! in the calling driver logic and panic instead of producing an error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use state_cache::cache::CacheKind;
//! use state_cache::errors::{CacheError, Result};
//!
//! fn build_sampler() -> Result<()> {
//!     Err(CacheError::OutOfDeviceMemory(CacheKind::Sampler))
//! }
//! ```

use thiserror::Error;

use crate::cache::CacheKind;

/// The error type for cache lookups that may create objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    // ========================================================================
    // Object Creation Errors
    // ========================================================================
    /// The device collaborator could not create the requested object.
    #[error("Failed to create {kind:?} object: {reason}")]
    ObjectCreationFailed {
        /// Which cache asked for the object
        kind: CacheKind,
        /// Backend-provided failure description
        reason: String,
    },

    /// Device memory was exhausted while creating an object.
    #[error("Out of device memory while creating {0:?} object")]
    OutOfDeviceMemory(CacheKind),

    /// Host memory was exhausted while creating an object.
    #[error("Out of host memory while creating {0:?} object")]
    OutOfHostMemory(CacheKind),

    // ========================================================================
    // Translation Errors
    // ========================================================================
    /// Packed state has no equivalent in the backend.
    #[error("Unsupported state: {0}")]
    Unsupported(String),
}

impl CacheError {
    /// Convenience constructor for [`CacheError::ObjectCreationFailed`].
    pub fn creation_failed(kind: CacheKind, reason: impl Into<String>) -> Self {
        Self::ObjectCreationFailed {
            kind,
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, CacheError>`.
pub type Result<T> = std::result::Result<T, CacheError>;
