use super::path::PathId;

/// A stroke between two atoms.
///
/// `order` starts at 1 and grows when parallel strokes are merged into one
/// bond. Style flags are set by the stereo passes and are mutually
/// compatible only in the combinations those passes produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: u8,
    pub exists: bool,
    /// Outline this bond was traced from.
    pub path: PathId,
    /// Hashed wedge; the wide end is `b`.
    pub hash: bool,
    /// Solid wedge; the narrow end is `a`.
    pub wedge: bool,
    /// Single bond drawn on one side of an adjacent double bond.
    pub up: bool,
    pub down: bool,
    pub arom: bool,
    /// Already merged with a parallel partner into a multiple bond.
    pub conjoined: bool,
    /// Came from a tiny stroke that other passes must not treat as a duplicate.
    pub small: bool,
}

impl Bond {
    /// Creates an existing plain single bond.
    pub fn new(a: usize, b: usize, path: PathId) -> Self {
        Self {
            a,
            b,
            order: 1,
            exists: true,
            path,
            hash: false,
            wedge: false,
            up: false,
            down: false,
            arom: false,
            conjoined: false,
            small: false,
        }
    }

    /// Exchanges the two endpoints.
    pub fn swap_ends(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    pub fn touches(&self, atom: usize) -> bool {
        self.a == atom || self.b == atom
    }

    /// Same atom pair in either direction.
    pub fn same_ends(&self, other: &Bond) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }

    /// Order-1 bond with no stereo style.
    pub fn is_plain_single(&self) -> bool {
        self.order == 1 && !self.wedge && !self.hash
    }
}
