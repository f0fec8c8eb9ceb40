//! Reading trace scenes and writing recognized structures.
//!
//! - [`scene`] — TOML trace files: pre-vectorized outlines, a glyph table,
//!   regions, arrows and plus marks, acting as [`Vectorizer`](crate::Vectorizer)
//!   and [`CharRecognizer`](crate::CharRecognizer)
//! - [`molfile`] — V2000 molfile blocks, SDF records and RXN reactions

use std::fmt;

pub mod error;
pub mod molfile;
pub mod scene;

pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Scene,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Scene => write!(f, "trace scene"),
        }
    }
}
