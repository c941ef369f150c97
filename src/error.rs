//! Unified error types for substore.
//!
//! This module provides a single error type covering composition-time
//! failures and slice-action failures. The composition core performs no
//! local recovery: every error surfaces unchanged to whichever caller
//! triggered the failing operation.

use thiserror::Error;

/// All substore errors.
///
/// This is the canonical error type for composition and slice-action
/// operations. Construction-order violations (using a scoped mutator or
/// global reader before the store finishes constructing) are programming
/// errors and panic instead of appearing here.
#[derive(Debug, Error)]
pub enum Error {
    /// The same slice key was registered twice in one composition.
    #[error("duplicate slice key: {0}")]
    DuplicateSlice(String),

    /// A slice declared in the composite shape was not produced by any
    /// initializer (checked composition only).
    #[error("missing slice: {0}")]
    MissingSlice(String),

    /// An initializer's record does not match the declared composite shape
    /// (checked composition only).
    #[error("shape mismatch in slice `{slice}`: {detail}")]
    ShapeMismatch {
        /// Key of the offending slice
        slice: String,
        /// What differed from the declared shape
        detail: String,
    },

    /// An action was invoked by name but the field is absent or not an
    /// action.
    #[error("no such action: {0}")]
    NoSuchAction(String),

    /// A slice action's own invariant check failed (e.g. a cross-slice
    /// precondition). Raised by slice code, propagated unchanged.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

/// Result type for substore operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error was raised at composition time (before the
    /// store ever went live).
    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            Error::DuplicateSlice(_) | Error::MissingSlice(_) | Error::ShapeMismatch { .. }
        )
    }

    /// Check if this is a precondition failure raised by slice code.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_))
    }
}
