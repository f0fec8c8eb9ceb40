//! Classification and merging of parallel strokes.
//!
//! The tracer outlines every stroke, so a single line arrives as two
//! parallel bonds (its two edges) and a double bond as up to four. These
//! passes collapse edge pairs into one bond, measure the typical spacing of
//! multiple bonds, promote close parallel pairs and triples to higher
//! orders, and turn tiny blobs into short "small" bonds.

use super::config::Tolerances;
use super::error::Error;
use super::raster::Raster;
use crate::model::geometry::{BondFrame, Point};
use crate::model::path::{PathId, PathTree};
use crate::model::sketch::Sketch;

/// At most this many outline points describe a small blob.
const MAX_DOTS: usize = 20;

fn parallel(sketch: &Sketch, i: usize, j: usize, tolerances: &Tolerances) -> bool {
    sketch.bond_cosine(i, j).abs() > tolerances.parallel_cosine
}

/// Moves `p` halfway to `q`, then `q` halfway to the new `p`.
pub(super) fn pull_together(sketch: &mut Sketch, p: usize, q: usize) {
    let mid = sketch.point(p).midpoint(sketch.point(q));
    sketch.atoms[p].set_point(mid);
    let mid = mid.midpoint(sketch.point(q));
    sketch.atoms[q].set_point(mid);
}

/// Pulls each end of `drop` that lies beyond the matching end of `keep`
/// (further to the side than along the axis) toward that end.
fn merge_ends(sketch: &mut Sketch, keep: usize, drop: usize, cosine: f64, keep_leads: bool) {
    for at_a in [true, false] {
        let Some(frame) = sketch.bond_frame(keep) else {
            return;
        };
        let (ka, kb) = (sketch.bonds[keep].a, sketch.bonds[keep].b);
        let end = if at_a { sketch.bonds[drop].a } else { sketch.bonds[drop].b };
        let p = sketch.point(end);
        let side = frame.offset(p).abs();
        let from_a = frame.along(p).abs();
        let from_b = frame.along_from_end(p).abs();
        let target = match (cosine > 0.0, cosine < 0.0, at_a) {
            (true, _, true) if side > from_a => Some(ka),
            (_, true, true) if side > from_b => Some(kb),
            (true, _, false) if side > from_b => Some(kb),
            (_, true, false) if side > from_a => Some(ka),
            _ => None,
        };
        if let Some(target) = target {
            if keep_leads && cosine > 0.0 {
                pull_together(sketch, target, end);
            } else {
                pull_together(sketch, end, target);
            }
        }
    }
}

/// Collapses the two traced edges of each stroke into a single bond.
///
/// Two bonds are edges of one stroke when they overlap along their length
/// and are either closer than `dist`, or parallel with solid ink between
/// them and no further apart than the maximum stroke thickness. The shorter
/// edge is retired and the survivor reset to order 1.
///
/// # Returns
///
/// The median edge separation, which is the self-calibrated line
/// thickness; `dist` when no pair was found.
pub fn skeletize(sketch: &mut Sketch, raster: &Raster, dist: f64, avg: f64, tolerances: &Tolerances) -> f64 {
    let mut separations = Vec::new();
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists || sketch.bonds[i].small {
            continue;
        }
        let l1 = sketch.bond_length(i);
        for j in 0..sketch.bonds.len() {
            if i == j
                || !sketch.bonds[j].exists
                || sketch.bonds[j].small
                || !sketch.bonds_within_each_other(i, j)
            {
                continue;
            }
            let tt = sketch.distance_between_bonds(i, j);
            let cosine = sketch.bond_cosine(i, j);
            let solid = tt < tolerances.max_bond_thickness && cosine.abs() > tolerances.parallel_cosine && {
                let (ai, bi) = sketch.bond_points(i);
                let (aj, bj) = sketch.bond_points(j);
                raster.no_white_space(ai, bi, aj, bj)
            };
            if !solid && tt >= dist {
                continue;
            }
            let l2 = sketch.bond_length(j);
            separations.push(tt);
            if l1 < l2 {
                absorb(sketch, j, i);
                if l1 > avg / 2.0 {
                    merge_ends(sketch, j, i, cosine, false);
                }
                break;
            }
            absorb(sketch, i, j);
            if l2 > avg / 2.0 {
                merge_ends(sketch, i, j, cosine, true);
            }
        }
    }
    separations.sort_by(f64::total_cmp);
    let thickness = if separations.is_empty() {
        dist
    } else {
        separations[(separations.len() - 1) / 2]
    };
    tracing::debug!(pairs = separations.len(), thickness, "strokes skeletized");
    thickness
}

/// Retires `drop` in favor of `keep`, which becomes a single bond.
fn absorb(sketch: &mut Sketch, keep: usize, drop: usize) {
    sketch.bonds[drop].exists = false;
    sketch.bonds[keep].order = 1;
    if sketch.bonds[drop].arom {
        sketch.bonds[keep].arom = true;
    }
}

/// Typical separation of the lines of a double bond.
///
/// Takes the 75th percentile of separations between overlapping parallel
/// bonds closer than half a bond length, adds two pixels of slack and
/// snaps up to any observed separation less than a pixel beyond that. Also
/// clears every `conjoined` flag ahead of [`double_triple_bonds`].
pub fn dist_double_bonds(sketch: &mut Sketch, avg: f64, tolerances: &Tolerances) -> f64 {
    let mut seps = Vec::new();
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists {
            continue;
        }
        let l1 = sketch.bond_length(i);
        sketch.bonds[i].conjoined = false;
        for j in i + 1..sketch.bonds.len() {
            if !sketch.bonds[j].exists || !parallel(sketch, i, j, tolerances) {
                continue;
            }
            let l2 = sketch.bond_length(j);
            let d = sketch.distance_between_bonds(i, j);
            if d < avg / 2.0 && l1 > avg / 3.0 && l2 > avg / 3.0 && sketch.bonds_within_each_other(i, j) {
                seps.push(d);
            }
        }
    }
    seps.sort_by(f64::total_cmp);
    let mut max_dist = seps.get(3 * seps.len().saturating_sub(1) / 4).copied().unwrap_or(0.0);
    if max_dist < 1.0 {
        max_dist = avg / 3.0;
    } else {
        max_dist += 2.0;
        for &d in &seps {
            if d - max_dist < 1.0 && d > max_dist {
                max_dist = d;
            }
        }
    }
    max_dist + 0.001
}

/// Adds `drop`'s order onto `keep` when `counts`, marking them conjoined
/// when both came from the same outline.
fn fold_order(sketch: &mut Sketch, keep: usize, drop: usize, counts: bool) {
    sketch.bonds[drop].exists = false;
    if counts {
        let order = sketch.bonds[drop].order;
        sketch.bonds[keep].order = sketch.bonds[keep].order.saturating_add(order);
        if sketch.bonds[keep].path == sketch.bonds[drop].path {
            sketch.bonds[keep].conjoined = true;
        }
    }
    if sketch.bonds[drop].arom {
        sketch.bonds[keep].arom = true;
    }
}

/// Promotes close parallel bonds to double and triple bonds.
///
/// When a long bond runs alongside a clearly shorter one (a double bond
/// drawn off-center, or one line of a triple bond), the long bond is split
/// where the short one ends: the overhanging pieces become new single
/// bonds and the middle takes the accumulated order.
pub fn double_triple_bonds(
    sketch: &mut Sketch,
    avg: f64,
    max_dist: f64,
    tolerances: &Tolerances,
) -> Result<(), Error> {
    let mut i = 0;
    while i < sketch.bonds.len() {
        if !sketch.bonds[i].exists {
            i += 1;
            continue;
        }
        let l1 = sketch.bond_length(i);
        let mut j = i + 1;
        while j < sketch.bonds.len() {
            if !sketch.bonds[j].exists || !parallel(sketch, i, j, tolerances) {
                j += 1;
                continue;
            }
            let l2 = sketch.bond_length(j);
            let dij = sketch.distance_between_bonds(i, j);
            if dij > max_dist || !sketch.bonds_within_each_other(i, j) {
                j += 1;
                continue;
            }

            let mut k = j + 1;
            while k < sketch.bonds.len() {
                if sketch.bonds[k].exists && parallel(sketch, k, j, tolerances) {
                    let l3 = sketch.bond_length(k);
                    let djk = sketch.distance_between_bonds(k, j);
                    let dik = sketch.distance_between_bonds(k, i);
                    if djk <= max_dist && sketch.bonds_within_each_other(k, j) {
                        if dik > dij {
                            let counts = l3 > l2 / 2.0 || (l2 > avg && l2 > 1.5 * l3 && l3 > 0.5 * avg);
                            fold_order(sketch, j, k, counts);
                        } else {
                            let counts = l2 > l3 / 2.0 || (l3 > avg && l3 > 1.5 * l2 && l2 > 0.5 * avg);
                            fold_order(sketch, k, j, counts);
                            break;
                        }
                    }
                }
                k += 1;
            }
            if !sketch.bonds[j].exists {
                j += 1;
                continue;
            }

            let extended = if l1 > avg && l1 > 1.5 * l2 && l2 > 0.5 * avg {
                Some((i, j, l1, l2))
            } else if l2 > avg && l2 > 1.5 * l1 && l1 > 0.5 * avg {
                Some((j, i, l2, l1))
            } else {
                None
            };
            if let Some((long, short, long_len, short_len)) = extended {
                split_overhangs(sketch, long, short, long_len, short_len)?;
                fold_order(sketch, long, short, true);
                if short == i {
                    break;
                }
            } else if l1 > l2 {
                fold_order(sketch, i, j, l2 > l1 / 2.0);
            } else {
                fold_order(sketch, j, i, l1 > l2 / 2.0);
                break;
            }
            j += 1;
        }
        i += 1;
    }
    tracing::debug!(bonds = sketch.count_bonds().0, "multiple bonds merged");
    Ok(())
}

/// Cuts off the parts of `long` that extend beyond `short` at either end.
fn split_overhangs(
    sketch: &mut Sketch,
    long: usize,
    short: usize,
    long_len: f64,
    short_len: f64,
) -> Result<(), Error> {
    let Some(frame) = sketch.bond_frame(long) else {
        return Ok(());
    };
    let (sa, sb) = sketch.bond_points(short);
    let da = frame.along(sa).abs().min(frame.along(sb).abs());
    let db = frame.along_from_end(sa).abs().min(frame.along_from_end(sb).abs());
    let path = sketch.bonds[long].path;
    let (pa, pb) = sketch.bond_points(long);
    if da > 0.5 * short_len {
        let from = sketch.bonds[long].a;
        sketch.bonds[long].a = splice(sketch, from, pa, pb, da / long_len, path)?;
    }
    if db > 0.5 * short_len {
        let from = sketch.bonds[long].b;
        sketch.bonds[long].b = splice(sketch, from, pb, pa, db / long_len, path)?;
    }
    Ok(())
}

/// Inserts an atom at fraction `t` of the way from `p` to `q`, bonded to
/// `from` (the atom at `p`).
fn splice(sketch: &mut Sketch, from: usize, p: Point, q: Point, t: f64, path: PathId) -> Result<usize, Error> {
    let atom = sketch.add_atom(p.x + (q.x - p.x) * t, p.y + (q.y - p.y) * t, path)?;
    sketch.add_bond(from, atom, path)?;
    Ok(atom)
}

/// Replaces small or straight blobs by a single short bond.
///
/// A positive outline of at most `max_area` whose points stay within
/// `thickness` of the line through its extreme points (or whose area is
/// below `small_area`) is a short stroke; its traced skeleton is replaced by
/// one bond flagged `small`.
pub fn find_small_bonds(
    tree: &PathTree,
    sketch: &mut Sketch,
    max_area: f64,
    small_area: f64,
    thickness: f64,
) -> Result<(), Error> {
    for path in tree.iter() {
        if !path.is_positive() || path.area > max_area {
            continue;
        }
        let mut dots: Vec<_> = sketch
            .atoms
            .iter()
            .filter(|a| a.exists && a.path == path.id)
            .map(|a| a.point())
            .take(MAX_DOTS)
            .collect();
        if dots.len() <= 2 {
            continue;
        }
        let (mut l, mut r, mut t, mut b) = (dots[0].x, dots[0].x, dots[0].y, dots[0].y);
        for d in &dots[1..] {
            l = l.min(d.x);
            r = r.max(d.x);
            t = t.min(d.y);
            b = b.max(d.y);
        }
        if r - l > b - t {
            dots.sort_by(|p, q| p.x.total_cmp(&q.x));
        } else {
            dots.sort_by(|p, q| p.y.total_cmp(&q.y));
        }
        let (first, last) = (dots[0], dots[dots.len() - 1]);
        let deviation = BondFrame::new(first, last).map_or(0.0, |frame| {
            dots[1..dots.len() - 1]
                .iter()
                .map(|&d| frame.offset(d).abs())
                .fold(0.0, f64::max)
        });
        if deviation < thickness || path.area < small_area {
            sketch.delete_curve(path.id);
            let a = sketch.add_atom(first.x, first.y, path.id)?;
            let b = sketch.add_atom(last.x, last.y, path.id)?;
            let bond = sketch.add_bond(a, b, path.id)?;
            sketch.bonds[bond].small = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::raster::tests::make_canvas;
    use crate::model::path::{PathSign, Segment, VectorPath};
    use crate::model::sketch::tests::make_sketch;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn blank_raster() -> Raster {
        Raster::new(make_canvas(80, 80), 0.4)
    }

    #[test]
    fn coincident_strokes_collapse_to_one_single_bond() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (30.0, 0.0), (0.0, 0.0), (30.0, 0.0)],
            &[(0, 1), (2, 3)],
        );
        sketch.bonds[0].order = 2;
        let tol = Tolerances::default();
        let thickness = skeletize(&mut sketch, &blank_raster(), 3.0, 30.0, &tol);
        assert_eq!(sketch.count_bonds(), (1, 1));
        assert!(sketch.bonds[0].exists);
        assert!(approx_eq(thickness, 0.0));
    }

    #[test]
    fn skeletize_without_pairs_falls_back_to_dist() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0), (0.0, 20.0), (30.0, 20.0)], &[(0, 1), (2, 3)]);
        let tol = Tolerances::default();
        let thickness = skeletize(&mut sketch, &blank_raster(), 3.0, 30.0, &tol);
        assert!(approx_eq(thickness, 3.0));
        assert_eq!(sketch.count_bonds().0, 2);
    }

    #[test]
    fn double_bond_spacing_gets_slack() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (30.0, 0.0), (0.0, 4.0), (30.0, 4.0)],
            &[(0, 1), (2, 3)],
        );
        sketch.bonds[0].conjoined = true;
        let d = dist_double_bonds(&mut sketch, 30.0, &Tolerances::default());
        assert!(approx_eq(d, 6.001));
        assert!(!sketch.bonds[0].conjoined);
    }

    #[test]
    fn double_bond_spacing_defaults_to_third_of_bond() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0)], &[(0, 1)]);
        let d = dist_double_bonds(&mut sketch, 30.0, &Tolerances::default());
        assert!(approx_eq(d, 10.001));
    }

    #[test]
    fn parallel_pair_becomes_double_bond() {
        let max_dist = 5.0;
        let offset = max_dist - 1.0;
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (30.0, 0.0), (0.0, offset), (30.0, offset)],
            &[(0, 1), (2, 3)],
        );
        double_triple_bonds(&mut sketch, 30.0, max_dist, &Tolerances::default()).unwrap();
        assert_eq!(sketch.count_bonds(), (1, 2));
        assert!(sketch.bonds[1].exists);
    }

    #[test]
    fn three_parallel_lines_become_triple_bond() {
        let mut sketch = make_sketch(
            &[
                (0.0, 0.0),
                (30.0, 0.0),
                (0.0, 4.0),
                (30.0, 4.0),
                (0.0, 8.0),
                (30.0, 8.0),
            ],
            &[(0, 1), (2, 3), (4, 5)],
        );
        double_triple_bonds(&mut sketch, 30.0, 5.0, &Tolerances::default()).unwrap();
        assert_eq!(sketch.count_bonds(), (1, 3));
        assert!(sketch.bonds[1].exists);
    }

    #[test]
    fn long_bond_is_split_around_short_partner() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (60.0, 0.0), (20.0, 4.0), (40.0, 4.0)],
            &[(0, 1), (2, 3)],
        );
        double_triple_bonds(&mut sketch, 36.0, 5.0, &Tolerances::default()).unwrap();

        assert!(!sketch.bonds[1].exists);
        let middle = &sketch.bonds[0];
        assert_eq!(middle.order, 2);
        assert!(approx_eq(sketch.point(middle.a).x, 20.0));
        assert!(approx_eq(sketch.point(middle.b).x, 40.0));
        assert_eq!(sketch.count_bonds(), (3, 2));
        let (a, b) = sketch.bond_points(2);
        assert!(approx_eq(a.x, 0.0) && approx_eq(b.x, 20.0));
        let (a, b) = sketch.bond_points(3);
        assert!(approx_eq(a.x, 60.0) && approx_eq(b.x, 40.0));
    }

    #[test]
    fn straight_blob_becomes_small_bond() {
        let tree = PathTree::new(vec![VectorPath {
            id: PathId(1),
            sign: PathSign::Positive,
            area: 8.0,
            segments: vec![Segment::corner(Point::new(1.0, 1.0), Point::new(0.0, 0.0))],
            children: vec![],
        }]);
        let mut sketch = make_sketch(&[(0.0, 0.0), (4.0, 0.5), (8.0, 0.0)], &[(0, 1), (1, 2)]);
        for atom in sketch.atoms.iter_mut() {
            atom.path = PathId(1);
        }
        for bond in sketch.bonds.iter_mut() {
            bond.path = PathId(1);
        }
        find_small_bonds(&tree, &mut sketch, 50.0, 2.0, 1.0).unwrap();

        assert_eq!(sketch.count_bonds().0, 1);
        let bond = &sketch.bonds[2];
        assert!(bond.exists && bond.small);
        assert_eq!(sketch.point(bond.a), Point::new(0.0, 0.0));
        assert_eq!(sketch.point(bond.b), Point::new(8.0, 0.0));
        assert_eq!(sketch.count_atoms(), 2);
    }
}
