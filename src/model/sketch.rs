//! The mutable working state of one region at one resolution.
//!
//! A [`Sketch`] owns the atom, bond and letter arenas that every recognition
//! pass reads and edits, plus the labels assembled from letters. Elements are
//! retired with `exists = false`; indices are never invalidated.

use super::arena::{Arena, CapacityError};
use super::atom::Atom;
use super::bond::Bond;
use super::geometry::{self, BondFrame, Point, Rect};
use super::letter::{Label, Letter};
use super::path::{PathId, PathTree};

#[derive(Debug, Clone)]
pub struct Sketch {
    pub atoms: Arena<Atom>,
    pub bonds: Arena<Bond>,
    pub letters: Arena<Letter>,
    pub labels: Vec<Label>,
}

impl Sketch {
    /// Creates an empty sketch whose arenas each hold at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            atoms: Arena::new("atom", capacity),
            bonds: Arena::new("bond", capacity),
            letters: Arena::new("letter", capacity),
            labels: Vec::new(),
        }
    }

    pub fn add_atom(&mut self, x: f64, y: f64, path: PathId) -> Result<usize, CapacityError> {
        self.atoms.push(Atom::new(x, y, path))
    }

    pub fn add_bond(&mut self, a: usize, b: usize, path: PathId) -> Result<usize, CapacityError> {
        self.bonds.push(Bond::new(a, b, path))
    }

    pub fn add_letter(
        &mut self,
        ch: char,
        x: f64,
        y: f64,
        r: f64,
    ) -> Result<usize, CapacityError> {
        self.letters.push(Letter::new(ch, x, y, r))
    }

    /// Indices of bonds that still exist.
    pub fn existing_bonds(&self) -> impl Iterator<Item = usize> + '_ {
        self.bonds
            .iter()
            .enumerate()
            .filter(|(_, b)| b.exists)
            .map(|(i, _)| i)
    }

    /// Indices of atoms that still exist.
    pub fn existing_atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.exists)
            .map(|(i, _)| i)
    }

    pub fn count_atoms(&self) -> usize {
        self.atoms.iter().filter(|a| a.exists).count()
    }

    /// Number of existing bonds and the highest order among them.
    pub fn count_bonds(&self) -> (usize, u8) {
        self.bonds
            .iter()
            .filter(|b| b.exists)
            .fold((0, 0), |(n, max), b| (n + 1, max.max(b.order)))
    }

    pub fn point(&self, atom: usize) -> Point {
        self.atoms[atom].point()
    }

    pub fn bond_points(&self, bond: usize) -> (Point, Point) {
        let b = &self.bonds[bond];
        (self.point(b.a), self.point(b.b))
    }

    pub fn bond_length(&self, bond: usize) -> f64 {
        let (a, b) = self.bond_points(bond);
        a.distance(b)
    }

    /// Frame along `a → b`, `None` for a zero-length bond.
    pub fn bond_frame(&self, bond: usize) -> Option<BondFrame> {
        let (a, b) = self.bond_points(bond);
        BondFrame::new(a, b)
    }

    /// Cosine of the angle between two bonds' directions.
    pub fn bond_cosine(&self, i: usize, j: usize) -> f64 {
        let (a1, b1) = self.bond_points(i);
        let (a2, b2) = self.bond_points(j);
        geometry::cosine(a1, b1, a2, b2)
    }

    /// Perpendicular separation of bond `j` from bond `i`'s line.
    ///
    /// `f64::MAX` when the two ends of `j` sit at visibly different offsets,
    /// i.e. the bonds are not parallel.
    pub fn distance_between_bonds(&self, i: usize, j: usize) -> f64 {
        let Some(frame) = self.bond_frame(i) else {
            return f64::MAX;
        };
        let (ja, jb) = self.bond_points(j);
        let y3 = frame.offset(ja);
        let y4 = frame.offset(jb);
        if (y3 - y4).abs() >= 4.0 {
            return f64::MAX;
        }
        y3.abs().max(y4.abs())
    }

    /// The shorter bond's midpoint projects strictly inside the longer bond.
    pub fn bonds_within_each_other(&self, ii: usize, jj: usize) -> bool {
        let (long, short) = if self.bond_length(ii) > self.bond_length(jj) {
            (ii, jj)
        } else {
            (jj, ii)
        };
        let Some(frame) = self.bond_frame(long) else {
            return false;
        };
        let (sa, sb) = self.bond_points(short);
        let mid = (frame.along(sa) + frame.along(sb)) / 2.0;
        mid > 0.0 && mid < frame.length()
    }

    /// No existing bond other than `bond` touches `atom`.
    pub fn terminal_bond(&self, atom: usize, bond: usize) -> bool {
        !self
            .bonds
            .iter()
            .enumerate()
            .any(|(l, b)| l != bond && b.exists && b.touches(atom))
    }

    /// Bond drawn by a small isolated positive outline.
    pub fn alone(&self, bond: usize, tree: &PathTree, avg: f64) -> bool {
        tree.get(self.bonds[bond].path)
            .is_some_and(|p| p.is_positive() && p.area < 2.0 * avg)
    }

    /// Retires every atom and bond traced from `path`.
    pub fn delete_curve(&mut self, path: PathId) {
        for atom in self.atoms.iter_mut().filter(|a| a.path == path) {
            atom.exists = false;
        }
        for bond in self.bonds.iter_mut().filter(|b| b.path == path) {
            bond.exists = false;
        }
    }

    /// Retires `path` and its direct children.
    pub fn delete_curve_with_children(&mut self, tree: &PathTree, path: PathId) {
        self.delete_curve(path);
        for &child in tree.children(path) {
            self.delete_curve(child);
        }
    }

    /// Retires bonds lying entirely inside `rect`.
    pub fn delete_bonds_in_rect(&mut self, rect: Rect) {
        for j in 0..self.bonds.len() {
            if !self.bonds[j].exists {
                continue;
            }
            let (a, b) = self.bond_points(j);
            if rect.contains(a) && rect.contains(b) {
                self.bonds[j].exists = false;
            }
        }
    }

    /// Points every existing bond end at `from` to `to`, one end per bond.
    pub fn retarget(&mut self, from: usize, to: usize) {
        for bond in self.bonds.iter_mut().filter(|b| b.exists) {
            if bond.a == from {
                bond.a = to;
            } else if bond.b == from {
                bond.b = to;
            }
        }
    }

    /// Some plain single bond traced from `path` still exists.
    pub fn path_has_plain_bond(&self, path: PathId) -> bool {
        self.bonds
            .iter()
            .any(|b| b.exists && b.path == path && b.is_plain_single())
    }

    /// Existing bonds whose endpoint atoms are not both existing.
    pub fn dangling_bonds(&self) -> Vec<usize> {
        self.existing_bonds()
            .filter(|&i| {
                let b = &self.bonds[i];
                !self.atoms[b.a].exists || !self.atoms[b.b].exists
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a sketch from coordinates and index pairs, one path per bond.
    pub(crate) fn make_sketch(points: &[(f64, f64)], bonds: &[(usize, usize)]) -> Sketch {
        let mut sketch = Sketch::new(1000);
        for &(x, y) in points {
            sketch.add_atom(x, y, PathId(0)).unwrap();
        }
        for (k, &(a, b)) in bonds.iter().enumerate() {
            sketch.add_bond(a, b, PathId(k as u32 + 1)).unwrap();
        }
        sketch
    }

    #[test]
    fn bond_length_and_counts() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0)], &[(0, 1), (1, 2)]);
        sketch.bonds[1].order = 2;
        assert!((sketch.bond_length(0) - 5.0).abs() < 1e-9);
        assert_eq!(sketch.count_atoms(), 3);
        assert_eq!(sketch.count_bonds(), (2, 2));
    }

    #[test]
    fn parallel_bonds_report_their_separation() {
        let sketch = make_sketch(
            &[(0.0, 0.0), (20.0, 0.0), (2.0, 3.0), (18.0, 3.0)],
            &[(0, 1), (2, 3)],
        );
        assert!((sketch.distance_between_bonds(0, 1) - 3.0).abs() < 1e-9);
        assert!(sketch.bonds_within_each_other(0, 1));
    }

    #[test]
    fn skewed_bonds_are_infinitely_far() {
        let sketch = make_sketch(
            &[(0.0, 0.0), (20.0, 0.0), (0.0, 1.0), (20.0, 9.0)],
            &[(0, 1), (2, 3)],
        );
        assert_eq!(sketch.distance_between_bonds(0, 1), f64::MAX);
    }

    #[test]
    fn terminal_bond_ignores_deleted_neighbors() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)], &[(0, 1), (1, 2)]);
        assert!(sketch.terminal_bond(0, 0));
        assert!(!sketch.terminal_bond(1, 0));
        sketch.bonds[1].exists = false;
        assert!(sketch.terminal_bond(1, 0));
    }

    #[test]
    fn delete_curve_with_children_retires_nested_paths() {
        use crate::model::path::{PathSign, Segment, VectorPath};
        let seg = Segment::corner(Point::new(1.0, 1.0), Point::new(0.0, 0.0));
        let tree = PathTree::new(vec![
            VectorPath {
                id: PathId(1),
                sign: PathSign::Positive,
                area: 10.0,
                segments: vec![seg],
                children: vec![PathId(2)],
            },
            VectorPath {
                id: PathId(2),
                sign: PathSign::Negative,
                area: 2.0,
                segments: vec![seg],
                children: vec![],
            },
        ]);
        let mut sketch = make_sketch(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], &[(0, 1), (1, 2)]);
        sketch.delete_curve_with_children(&tree, PathId(1));
        assert!(!sketch.bonds[0].exists);
        assert!(!sketch.bonds[1].exists);
        assert!(sketch.atoms[0].exists);
    }

    #[test]
    fn retarget_moves_one_end_per_bond() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], &[(0, 1), (1, 2)]);
        sketch.retarget(1, 2);
        assert_eq!((sketch.bonds[0].a, sketch.bonds[0].b), (0, 2));
        assert_eq!((sketch.bonds[1].a, sketch.bonds[1].b), (2, 2));
    }

    #[test]
    fn delete_bonds_in_rect_keeps_crossing_bonds() {
        let mut sketch = make_sketch(
            &[(1.0, 1.0), (4.0, 4.0), (2.0, 2.0), (9.0, 2.0)],
            &[(0, 1), (2, 3)],
        );
        sketch.delete_bonds_in_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(!sketch.bonds[0].exists);
        assert!(sketch.bonds[1].exists);
    }
}
