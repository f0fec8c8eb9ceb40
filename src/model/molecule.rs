//! Finished recognition results handed to and returned from the builder.

use super::geometry::Rect;

/// Integer bounding box in pixel coordinates, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x1),
            f64::from(self.y1),
            f64::from(self.x2),
            f64::from(self.y2),
        )
    }

    /// Reading order: whole rows top to bottom, then left to right within
    /// vertically overlapping boxes.
    pub fn reading_order(&self, other: &BoundingBox) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        if self.y2 < other.y1 {
            Ordering::Less
        } else if self.y1 > other.y2 {
            Ordering::Greater
        } else {
            self.x1.cmp(&other.x1)
        }
    }
}

/// One connected component of the sketch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub atoms: Vec<usize>,
    pub bbox: BoundingBox,
}

/// Graph summary used to accept or roll back topology edits and to score
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoleculeStatistics {
    pub fragments: usize,
    pub rotors: usize,
    /// Smallest rings of size five or six.
    pub rings56: usize,
    pub num_atoms: usize,
    pub num_bonds: usize,
}

/// An atom of a finished fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeAtom {
    pub x: f64,
    pub y: f64,
    /// Element symbol or abbreviation; `None` for carbon vertices.
    pub label: Option<String>,
    pub charge: i32,
    /// Replacement text when the label is a known abbreviation.
    pub expansion: Option<String>,
}

/// Stereo style of a finished bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BondStyle {
    #[default]
    Plain,
    Wedge,
    Hash,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeBond {
    /// Index into [`Molecule::atoms`].
    pub a: usize,
    pub b: usize,
    pub order: u8,
    pub style: BondStyle,
    pub aromatic: bool,
}

/// A compact, self-contained molecular graph for one fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Molecule {
    pub atoms: Vec<MoleculeAtom>,
    pub bonds: Vec<MoleculeBond>,
    /// Representative bond length in working pixels.
    pub avg_bond_length: f64,
    pub statistics: MoleculeStatistics,
}

/// What a [`MoleculeBuilder`](crate::MoleculeBuilder) returns for an accepted fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStructure {
    /// Serialized structure (SMILES, molfile, ...).
    pub text: String,
    pub confidence: f64,
    pub statistics: MoleculeStatistics,
}

/// A structure accepted for the page, positioned in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedStructure {
    pub structure: String,
    pub confidence: f64,
    /// Resolution candidate that produced the result.
    pub resolution: u32,
    pub page: usize,
    pub bbox: BoundingBox,
    /// Bond length in page pixels.
    pub bond_length: f64,
}
