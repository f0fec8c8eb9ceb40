//! A pure Rust library for reconstructing molecular graphs from chemical line-art.
//! It turns vectorized drawing outlines and recognized label glyphs into atoms and bonds,
//! classifies bond orders and stereo styles, repairs the topology, and picks the best
//! interpretation across several rendering resolutions.
//!
//! # Features
//!
//! - **Skeleton extraction** — Atom candidates from outline corners, bonds from the strokes
//!   between them
//! - **Label recognition** — Glyph classification through a pluggable recognizer, assembly of
//!   multi-letter labels, charges and abbreviation expansion
//! - **Bond perception** — Double and triple bonds from parallel strokes, wedge, hashed and
//!   up/down stereo bonds, bridge bonds drawn across rings
//! - **Resolution selection** — Multi-resolution trial with a confidence model and an
//!   average-bond-length outlier filter
//! - **Reactions** — Arrow and plus-sign driven assembly of reactants, products and agents
//! - **I/O** — TOML trace scenes in, V2000 molfile (SDF) and RXN records out
//!
//! # Quick Start
//!
//! The main entry point is [`process_document`], which takes rendered [`Page`]s, the
//! [`Collaborators`] that trace curves, classify glyphs and serialize structures, and a
//! [`ForgeConfig`]:
//!
//! ```
//! use sketch_forge::{Collaborators, ForgeConfig, Page, process_document};
//! use sketch_forge::io::scene::Scene;
//!
//! let scene = Scene::from_toml_str(
//!     r#"
//!     regions = [[0, 0, 39, 39]]
//!     "#,
//! )?;
//! let page = scene.page(image::GrayImage::from_pixel(40, 40, image::Luma([255])));
//!
//! let builder = sketch_forge::io::molfile::MolfileBuilder::default();
//! let collaborators = Collaborators {
//!     vectorizer: &scene,
//!     recognizer: &scene,
//!     builder: &builder,
//!     formatter: None,
//! };
//! let document = process_document(&[page], collaborators, &ForgeConfig::default())?;
//!
//! // A blank page yields no structures.
//! assert_eq!(document.structures().count(), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] — Trace scene reader, molfile and RXN writers
//! - [`process_document`] / [`process_page`] / [`forge`] — Page-level drivers
//! - [`ForgeConfig`] — Tolerances, resolution plan, dictionary and annotations
//!
//! # Data Types
//!
//! ## Input Structures
//!
//! - [`Page`] — Grayscale page image with regions, arrows and plus marks
//! - [`PathTree`] — Traced outlines of one region bitmap
//! - [`VectorPath`] / [`Segment`] — A closed outline and its corner or Bézier segments
//! - [`Arrow`] — Reaction arrow with tail, head and collected agent text
//!
//! ## Working Structures
//!
//! - [`Sketch`] — Atoms, bonds, letters and labels of one region
//! - [`Atom`] / [`Bond`] — Sketch vertices and edges with their style flags
//! - [`Letter`] / [`Label`] — Recognized glyphs and assembled multi-letter labels
//!
//! ## Output Structures
//!
//! - [`Molecule`] — Self-contained graph of one fragment handed to the builder
//! - [`BuiltStructure`] — Serialized structure returned by the builder
//! - [`RecognizedStructure`] — Accepted structure positioned on the page
//! - [`PageResult`] / [`DocumentResult`] — Per-page structures and reactions
//! - [`MoleculeStatistics`] — Fragment, rotor, ring and size counts
//!
//! ## Collaborators
//!
//! - [`Vectorizer`] — Bitmap to outlines
//! - [`CharRecognizer`] / [`RecognizerSession`] — Glyph classification
//! - [`MoleculeBuilder`] — Molecule to structure text
//! - [`ReactionFormatter`] — Reaction serialization

mod forge;
mod model;

pub mod io;

pub use model::atom::Atom;
pub use model::bond::Bond;
pub use model::geometry::{BondFrame, Point, Rect};
pub use model::letter::{Label, Letter};
pub use model::molecule::{
    BondStyle, BoundingBox, BuiltStructure, Fragment, Molecule, MoleculeAtom, MoleculeBond,
    MoleculeStatistics, RecognizedStructure,
};
pub use model::path::{PathId, PathSign, PathTree, Segment, SegmentTag, VectorPath};
pub use model::reaction::Arrow;
pub use model::sketch::Sketch;

pub use forge::{
    AUTO_RESOLUTIONS, Annotations, BondLimits, CharRecognizer, Collaborators, DEFAULT_CAPACITY,
    Dictionary, DocumentResult, ForgeConfig, ForgedRegion, MAX_WORKING_RESOLUTION,
    MoleculeBuilder, NoiseFactor, Page, PageResult, Placement, PreparedRegion, Preprocess,
    Raster, ReactionFormatter, RecognizerSession, ResolutionPlan, ResolutionProfile,
    ResolutionRun, Tolerances, Vectorizer, arrange_reactions, confidence, default_dictionary,
    find_limits_on_avg_bond, forge, forge_region, load_dictionary, molecule_statistics,
    prepare_region, process_document, process_page, recognize_fragments, sketch_statistics,
};

pub use forge::Error as ForgeError;
