//! Converts traced outlines into the initial atom/bond skeleton.
//!
//! Every characteristic point of an outline becomes a candidate atom. A
//! decimation walk keeps only the points where the outline turns, and the
//! kept points are joined cyclically with single bonds.

use super::config::Tolerances;
use super::error::Error;
use crate::model::geometry::BondFrame;
use crate::model::path::{PathId, PathTree};
use crate::model::sketch::Sketch;

/// Adds atoms and bonds for every outline of `tree`.
pub fn find_atoms(tree: &PathTree, sketch: &mut Sketch, tolerances: &Tolerances) -> Result<(), Error> {
    for path in tree.iter() {
        let points = path.outline_points();
        let mut indices = Vec::with_capacity(points.len());
        for p in &points {
            let i = sketch.add_atom(p.point.x, p.point.y, path.id)?;
            sketch.atoms[i].exists = false;
            sketch.atoms[i].corner = p.corner;
            indices.push(i);
        }
        let keep = decimate(sketch, &indices, tolerances);
        link_cycle(sketch, &indices, &keep, path.id)?;
    }
    tracing::debug!(
        atoms = sketch.count_atoms(),
        bonds = sketch.count_bonds().0,
        "skeleton traced"
    );
    Ok(())
}

fn decimate(sketch: &Sketch, indices: &[usize], tolerances: &Tolerances) -> Vec<bool> {
    let n = indices.len();
    let mut keep = vec![false; n];
    let mut last = 0;
    for i in 1..n {
        if sketch.atoms[indices[i]].corner
            || dir_change(sketch, indices, i, last, tolerances)
            || smaller_distance(sketch, indices, i, last)
        {
            keep[i] = true;
            last = i;
        }
    }
    keep
}

/// The outline bends at `n`: the next point far enough from `n` sits off
/// the chord `n → last` by more than the direction-change tolerance.
fn dir_change(sketch: &Sketch, indices: &[usize], n: usize, last: usize, tolerances: &Tolerances) -> bool {
    let total = indices.len();
    let pn = sketch.point(indices[n]);
    let mut m = (n + 1) % total;
    while m != n && sketch.point(indices[m]).distance(pn) < tolerances.v_displacement {
        m = (m + 1) % total;
    }
    if m == n {
        return false;
    }
    BondFrame::new(pn, sketch.point(indices[last]))
        .is_some_and(|frame| frame.offset(sketch.point(indices[m])).abs() > tolerances.dir_change)
}

/// Moving on from `n` would bring the walk closer to `last` again.
fn smaller_distance(sketch: &Sketch, indices: &[usize], n: usize, last: usize) -> bool {
    let m = (n + 1) % indices.len();
    let pl = sketch.point(indices[last]);
    sketch.point(indices[n]).distance(pl) > sketch.point(indices[m]).distance(pl)
}

fn link_cycle(
    sketch: &mut Sketch,
    indices: &[usize],
    keep: &[bool],
    path: PathId,
) -> Result<(), Error> {
    let kept: Vec<usize> = indices
        .iter()
        .zip(keep)
        .filter(|&(_, &k)| k)
        .map(|(&i, _)| i)
        .collect();
    if kept.len() < 2 {
        return Ok(());
    }
    for &i in &kept {
        sketch.atoms[i].exists = true;
    }
    for (k, &a) in kept.iter().enumerate() {
        let b = kept[(k + 1) % kept.len()];
        sketch.add_bond(a, b, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::Point;
    use crate::model::path::{PathSign, Segment, VectorPath};

    fn make_rectangle(id: u32, left: f64, top: f64, w: f64, h: f64) -> VectorPath {
        let p = Point::new;
        VectorPath {
            id: PathId(id),
            sign: PathSign::Positive,
            area: w * h,
            segments: vec![
                Segment::corner(p(left + w, top), p(left + w, top + h / 2.0)),
                Segment::corner(p(left + w, top + h), p(left + w / 2.0, top + h)),
                Segment::corner(p(left, top + h), p(left, top + h / 2.0)),
                Segment::corner(p(left, top), p(left + w / 2.0, top)),
            ],
            children: vec![],
        }
    }

    #[test]
    fn rectangle_keeps_its_corners() {
        let tree = PathTree::new(vec![make_rectangle(1, 0.0, 0.0, 40.0, 2.0)]);
        let mut sketch = Sketch::new(100);
        find_atoms(&tree, &mut sketch, &Tolerances::default()).unwrap();

        let corners: Vec<_> = sketch
            .existing_atoms()
            .filter(|&i| sketch.atoms[i].corner)
            .collect();
        assert_eq!(corners.len(), 4);
        assert!(sketch.count_bonds().0 >= 4);
        for i in sketch.existing_bonds() {
            let b = &sketch.bonds[i];
            assert!(sketch.atoms[b.a].exists && sketch.atoms[b.b].exists);
            assert_eq!(b.path, PathId(1));
            assert_eq!(b.order, 1);
        }
    }

    #[test]
    fn bonds_close_the_cycle() {
        let tree = PathTree::new(vec![make_rectangle(3, 10.0, 10.0, 30.0, 30.0)]);
        let mut sketch = Sketch::new(100);
        find_atoms(&tree, &mut sketch, &Tolerances::default()).unwrap();
        let mut degree = vec![0; sketch.atoms.len()];
        for i in sketch.existing_bonds() {
            degree[sketch.bonds[i].a] += 1;
            degree[sketch.bonds[i].b] += 1;
        }
        for i in sketch.existing_atoms() {
            assert_eq!(degree[i], 2);
        }
    }

    #[test]
    fn capacity_overflow_is_reported() {
        let tree = PathTree::new(vec![make_rectangle(1, 0.0, 0.0, 40.0, 40.0)]);
        let mut sketch = Sketch::new(3);
        let err = find_atoms(&tree, &mut sketch, &Tolerances::default()).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { kind: "atom", .. }));
    }
}
