use super::geometry::Point;

/// A reaction arrow detected on the page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arrow {
    pub tail: Point,
    pub head: Point,
    /// Agent text collected from structures drawn over the arrow.
    pub agent: String,
}

impl Arrow {
    pub fn new(tail: Point, head: Point) -> Self {
        Self {
            tail,
            head,
            agent: String::new(),
        }
    }

    pub fn length(&self) -> f64 {
        self.tail.distance(self.head)
    }

    pub fn midpoint(&self) -> Point {
        self.tail.midpoint(self.head)
    }
}
