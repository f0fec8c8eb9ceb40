use super::geometry::Point;
use super::path::PathId;

/// A candidate atom position in the sketch.
///
/// Atoms start life as outline points of a traced path; most are discarded
/// during decimation and the rest are joined by bonds. An atom is never
/// removed from its arena, only marked with `exists = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub x: f64,
    pub y: f64,
    /// Element symbol or abbreviation; `None` means an unlabeled vertex (carbon).
    pub label: Option<String>,
    pub charge: i32,
    pub exists: bool,
    /// Outline this atom was created from.
    pub path: PathId,
    /// Came from a corner vertex of the outline.
    pub corner: bool,
    /// Attached to exactly one plain single bond.
    pub terminal: bool,
}

impl Atom {
    /// Creates an existing, unlabeled atom.
    pub fn new(x: f64, y: f64, path: PathId) -> Self {
        Self {
            x,
            y,
            label: None,
            charge: 0,
            exists: true,
            path,
            corner: false,
            terminal: false,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_point(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }

    pub fn is_labeled(&self) -> bool {
        self.label.is_some()
    }
}
