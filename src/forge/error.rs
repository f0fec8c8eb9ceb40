//! Error types for sketch recognition.
//!
//! This module defines the error type used throughout the forge module.
//! Errors are categorized by source: dictionary parsing, arena capacity,
//! the vectorizer collaborator, and malformed traced input.

use thiserror::Error;

use crate::model::arena::CapacityError;
use crate::model::path::PathId;

/// Errors that can occur while recognizing a sketch.
///
/// Geometric degeneracies never surface here; they are skipped inside the
/// passes. These variants abort one region at one resolution, and the page
/// driver logs them and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// An atom, bond or letter arena reached its configured capacity.
    ///
    /// Raise [`ForgeConfig::capacity`](crate::ForgeConfig::capacity) for very
    /// dense drawings.
    #[error("too many {kind} elements: capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// Which arena overflowed.
        kind: &'static str,
        /// The configured capacity.
        capacity: usize,
    },

    /// Failed to parse a label dictionary TOML.
    #[error("failed to parse label dictionary: {0}")]
    DictionaryParse(#[from] toml::de::Error),

    /// The vectorizer could not trace the bitmap.
    #[error("vectorization failed: {0}")]
    Vectorizer(String),

    /// A traced outline is structurally unusable.
    #[error("invalid traced path {id}: {detail}")]
    InvalidPath {
        /// Identifier of the offending outline.
        id: u32,
        /// Description of the problem.
        detail: String,
    },

    /// The page image has no pixels.
    #[error("page {page} is empty: the image has no pixels")]
    EmptyPage {
        /// Zero-based page index.
        page: usize,
    },
}

impl From<CapacityError> for Error {
    fn from(e: CapacityError) -> Self {
        Error::CapacityExceeded {
            kind: e.kind,
            capacity: e.capacity,
        }
    }
}

impl Error {
    /// Creates a [`Vectorizer`](Error::Vectorizer) error.
    ///
    /// # Arguments
    ///
    /// * `details` — Description of the tracing failure
    ///
    /// # Returns
    ///
    /// A [`Vectorizer`](Error::Vectorizer) error variant.
    pub fn vectorizer(details: impl Into<String>) -> Self {
        Self::Vectorizer(details.into())
    }

    /// Creates an [`InvalidPath`](Error::InvalidPath) error.
    ///
    /// # Arguments
    ///
    /// * `id` — Identifier of the offending outline
    /// * `details` — Description of the problem
    ///
    /// # Returns
    ///
    /// An [`InvalidPath`](Error::InvalidPath) error variant.
    pub fn invalid_path(id: PathId, details: impl Into<String>) -> Self {
        Self::InvalidPath {
            id: id.0,
            detail: details.into(),
        }
    }
}
