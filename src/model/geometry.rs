//! Planar geometry helpers shared by every recognition pass.
//!
//! Coordinates follow raster conventions: `x` grows to the right and `y`
//! grows downward. All measurements are in pixels of the working image.

/// A point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        distance(self.x, self.y, other.x, other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// An axis-aligned rectangle with inclusive integer-like bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Half the diagonal, used as the circumradius of a glyph box.
    pub fn half_diagonal(&self) -> f64 {
        distance(self.left, self.top, self.right, self.bottom) / 2.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Grows the rectangle to include `p`.
    pub fn include(&mut self, p: Point) {
        self.left = self.left.min(p.x);
        self.right = self.right.max(p.x);
        self.top = self.top.min(p.y);
        self.bottom = self.bottom.max(p.y);
    }

    /// Degenerate rectangle at a single point.
    pub fn at(p: Point) -> Rect {
        Rect::new(p.x, p.y, p.x, p.y)
    }
}

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2) * (x1 - x2) + (y1 - y2) * (y1 - y2)).sqrt()
}

/// Cosine of the angle between the directions `p1 → p2` and `p3 → p4`.
///
/// Returns `0.0` when either segment is degenerate so callers treat it as
/// perpendicular and skip it.
pub fn cosine(p1: Point, p2: Point, p3: Point, p4: Point) -> f64 {
    let l1 = p1.distance(p2);
    let l2 = p3.distance(p4);
    if l1 <= f64::EPSILON || l2 <= f64::EPSILON {
        return 0.0;
    }
    ((p1.x - p2.x) * (p3.x - p4.x) + (p1.y - p2.y) * (p3.y - p4.y)) / (l1 * l2)
}

/// Local frame attached to a directed segment `origin → end`.
///
/// Used to measure how far a point sits beside a bond (`offset`) and how far
/// along it (`along`, `along_from_end`).
#[derive(Debug, Clone, Copy)]
pub struct BondFrame {
    origin: Point,
    cos: f64,
    sin: f64,
    length: f64,
}

impl BondFrame {
    /// Builds the frame, or `None` for a zero-length segment.
    pub fn new(origin: Point, end: Point) -> Option<Self> {
        let length = origin.distance(end);
        if length <= f64::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            cos: (end.x - origin.x) / length,
            sin: -(end.y - origin.y) / length,
            length,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Signed perpendicular distance of `p` from the segment's line.
    pub fn offset(&self, p: Point) -> f64 {
        -(p.x - self.origin.x) * self.sin - (p.y - self.origin.y) * self.cos
    }

    /// Projection of `p` onto the segment, measured from the origin.
    pub fn along(&self, p: Point) -> f64 {
        (p.x - self.origin.x) * self.cos - (p.y - self.origin.y) * self.sin
    }

    /// Projection of `p` onto the segment, measured from the far end.
    pub fn along_from_end(&self, p: Point) -> f64 {
        self.along(p) - self.length
    }
}
