use super::geometry::Point;

/// A single recognized character placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Letter {
    pub x: f64,
    pub y: f64,
    /// Circumradius of the glyph box.
    pub r: f64,
    pub ch: char,
    /// Not yet absorbed into a multi-letter label.
    pub free: bool,
}

impl Letter {
    pub fn new(ch: char, x: f64, y: f64, r: f64) -> Self {
        Self {
            x,
            y,
            r,
            ch,
            free: true,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_sign(&self) -> bool {
        self.ch == '+' || self.ch == '-'
    }
}

/// An anchor of a label: the center and radius of one of its letters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Anchor {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A multi-letter group such as `CH3` or `OMe`.
///
/// The two anchors are the first and last letter that is neither a digit
/// nor a charge sign; bonds attach to whichever is closer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Label {
    pub text: String,
    pub letters: Vec<usize>,
    pub first: Anchor,
    pub last: Anchor,
}

impl Label {
    pub fn anchors(&self) -> [Anchor; 2] {
        [self.first, self.last]
    }

    /// Labels that are nothing but a charge marker never take a bond.
    pub fn is_charge_marker(&self) -> bool {
        self.text.starts_with('+') || self.text.starts_with('-')
    }
}
