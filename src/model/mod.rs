//! Core data structures for sketch recognition.
//!
//! - [`geometry`] – Points, rectangles and the bond-local measuring frame.
//! - [`arena`] – Capacity-bounded, index-stable storage.
//! - [`path`] – Traced outlines and their nesting.
//! - [`atom`], [`bond`], [`letter`] – Elements of the working sketch.
//! - [`sketch`] – The mutable state every recognition pass operates on.
//! - [`molecule`] – Finished fragments, statistics and accepted structures.
//! - [`reaction`] – Reaction arrows.
//!
//! The working [`Sketch`](sketch::Sketch) is loose: elements are
//! soft-deleted and may be redundant. The [`Molecule`](molecule::Molecule)
//! produced at the end of the pipeline is compact and self-contained.

pub mod arena;
pub mod atom;
pub mod bond;
pub mod geometry;
pub mod letter;
pub mod molecule;
pub mod path;
pub mod reaction;
pub mod sketch;
