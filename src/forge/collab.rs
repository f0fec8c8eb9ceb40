//! Interfaces to the collaborators the pipeline delegates to.
//!
//! Curve tracing, character classification, final structure building and
//! reaction formatting are supplied by the caller. Each trait is `Sync` so a
//! single instance can serve every page of a document in parallel.

use image::GrayImage;

use super::error::Error;
use crate::model::geometry::{Point, Rect};
use crate::model::molecule::{BuiltStructure, Molecule};
use crate::model::path::PathTree;

/// Where a region bitmap sits on the page.
///
/// A point `p` in region pixels corresponds to `origin + p * scale` in page
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point,
    pub scale: f64,
    /// The region is small enough that ambiguous pixels should be traced as ink.
    pub small_picture: bool,
}

impl Placement {
    pub fn to_page(&self, p: Point) -> Point {
        Point::new(self.origin.x + p.x * self.scale, self.origin.y + p.y * self.scale)
    }

    pub fn to_region(&self, p: Point) -> Point {
        Point::new((p.x - self.origin.x) / self.scale, (p.y - self.origin.y) / self.scale)
    }

    pub fn rect_to_page(&self, r: Rect) -> Rect {
        let a = self.to_page(Point::new(r.left, r.top));
        let b = self.to_page(Point::new(r.right, r.bottom));
        Rect::new(a.x, a.y, b.x, b.y)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            origin: Point::default(),
            scale: 1.0,
            small_picture: false,
        }
    }
}

/// Converts a binarized bitmap (ink = 0, background = 255) into outlines.
pub trait Vectorizer: Sync {
    fn trace(&self, bitmap: &GrayImage) -> Result<PathTree, Error>;

    /// Traces a region bitmap knowing where it sits on the page.
    fn trace_region(&self, bitmap: &GrayImage, placement: &Placement) -> Result<PathTree, Error> {
        let _ = placement;
        self.trace(bitmap)
    }
}

/// Image clean-up applied before classifying a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
    Raw,
    /// One de-noise pass.
    Despeckled,
    /// Two de-noise passes.
    DespeckledTwice,
}

impl Preprocess {
    /// The order in which glyph recognition is attempted.
    pub const ATTEMPTS: [Preprocess; 3] = [Self::Raw, Self::Despeckled, Self::DespeckledTwice];
}

/// Opens per-page character recognition sessions.
pub trait CharRecognizer: Sync {
    fn open_session(&self) -> Box<dyn RecognizerSession + '_>;
}

/// A recognition session owned by a single page.
pub trait RecognizerSession {
    /// Classifies the glyph inside `rect` of `raster`, or `None` when unsure.
    fn recognize(&mut self, raster: &GrayImage, rect: Rect, preprocess: Preprocess) -> Option<char>;

    /// Informs the session which region subsequent calls refer to.
    fn set_placement(&mut self, placement: &Placement) {
        let _ = placement;
    }
}

/// Turns a finished fragment into a serialized structure.
pub trait MoleculeBuilder: Sync {
    /// `None` (or empty text) drops the fragment.
    fn build(&self, molecule: &Molecule) -> Option<BuiltStructure>;
}

/// Serializes reactions assembled from structures on one page.
pub trait ReactionFormatter: Sync {
    fn format(&self, reactants: &[&str], products: &[&str], agent: &str) -> String;

    /// Text contributed to an arrow's agent by a structure drawn over it.
    fn agent_text(&self, structure: &str) -> String {
        structure.trim().to_string()
    }
}
