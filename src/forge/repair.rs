//! Topology repair: reattaching loose bond ends to labels and neighbors,
//! straightening chains, merging near-coincident atoms and reconnecting
//! fragments separated by drawing gaps.

use super::bonds::pull_together;
use super::config::Tolerances;
use super::error::Error;
use super::fragments::find_fragments;
use crate::model::geometry::{BondFrame, Point};
use crate::model::sketch::Sketch;

/// Label given to an atom that lost an unexplained tiny terminal stroke.
const UNKNOWN_LABEL: &str = "Xx";

/// Runs `sweep` until it reports no change, at most `max_sweeps` times.
pub(crate) fn settle(pass: &str, max_sweeps: usize, mut sweep: impl FnMut() -> bool) {
    for _ in 0..max_sweeps {
        if !sweep() {
            return;
        }
    }
    tracing::warn!(pass, max_sweeps, "repair pass did not settle, stopping");
}

/// How far beyond a bond end a label may sit.
#[derive(Debug, Clone, Copy)]
struct Reach {
    along: f64,
    across: f64,
}

/// The label or free letter closest beyond one end of a bond.
///
/// Returns `(label, letter)`; a letter, when found, wins over a label.
fn label_near_end(
    sketch: &Sketch,
    frame: &BondFrame,
    at_b: bool,
    reach: Reach,
    skip: (Option<usize>, Option<usize>),
) -> (Option<usize>, Option<usize>) {
    let mut best = f64::MAX;
    let mut candidate = |p: Point, r: f64| {
        let d = if at_b { frame.along_from_end(p) } else { frame.along(p) };
        let ahead = if at_b {
            d > -frame.length() / 2.0
        } else {
            d < frame.length() / 2.0
        };
        let gap = d.abs() - r;
        if gap <= reach.along && frame.offset(p).abs() <= reach.across + r / 2.0 && gap < best && ahead {
            best = gap;
            true
        } else {
            false
        }
    };

    let mut label = None;
    for (i, l) in sketch.labels.iter().enumerate() {
        if l.is_charge_marker() || skip.0 == Some(i) {
            continue;
        }
        for anchor in l.anchors() {
            if candidate(anchor.point(), anchor.r) {
                label = Some(i);
            }
        }
    }
    let mut letter = None;
    for (i, l) in sketch.letters.iter().enumerate() {
        if !l.free || l.is_sign() || skip.1 == Some(i) {
            continue;
        }
        if candidate(l.point(), l.r) {
            letter = Some(i);
        }
    }
    (label, letter)
}

fn attach_label(sketch: &mut Sketch, atom: usize, found: (Option<usize>, Option<usize>)) {
    match found {
        (_, Some(k)) => {
            let letter = &sketch.letters[k];
            let text: String = letter.ch.to_uppercase().collect();
            let at = letter.point();
            sketch.atoms[atom].label = Some(text);
            sketch.atoms[atom].set_point(at);
        }
        (Some(k), None) => {
            let label = &sketch.labels[k];
            let text = label.text.clone();
            let at = label.first.point().midpoint(label.last.point());
            sketch.atoms[atom].label = Some(text);
            sketch.atoms[atom].set_point(at);
        }
        (None, None) => {}
    }
}

/// Labels the free ends of bonds with the letter or label they point at.
///
/// An end qualifies when no other bond touches it and it has no label yet.
/// The target must lie within `avg` past the end (less its radius), within
/// `maxh` plus half its radius of the bond's line, and on the end's side of
/// the bond's midpoint. Multiple bonds get `max_dist_double` more sideways
/// room. The atom takes the text and moves onto the target.
pub fn extend_terminal_bond_to_label(sketch: &mut Sketch, avg: f64, maxh: f64, max_dist_double: f64) {
    for j in 0..sketch.bonds.len() {
        if !sketch.bonds[j].exists {
            continue;
        }
        let (a, b) = (sketch.bonds[j].a, sketch.bonds[j].b);
        let loose_a = sketch.terminal_bond(a, j) && sketch.atoms[a].label.is_none();
        let loose_b = sketch.terminal_bond(b, j) && sketch.atoms[b].label.is_none();
        let Some(frame) = sketch.bond_frame(j) else {
            continue;
        };
        let reach = Reach {
            along: avg,
            across: if sketch.bonds[j].order > 1 {
                maxh + max_dist_double
            } else {
                maxh
            },
        };

        let mut taken = (None, None);
        if loose_a {
            taken = label_near_end(sketch, &frame, false, reach, (None, None));
            attach_label(sketch, a, taken);
        }
        if loose_b {
            let found = label_near_end(sketch, &frame, true, reach, taken);
            attach_label(sketch, b, found);
        }
    }
}

/// Sideways tolerance for a bond: wider for separated multiple bonds.
fn slack(sketch: &Sketch, bond: usize, maxh: f64, max_dist_double: f64) -> f64 {
    let b = &sketch.bonds[bond];
    if b.order > 1 && !b.conjoined {
        maxh + max_dist_double
    } else {
        maxh
    }
}

/// The atom of another bond lying just past the given end of bond `j`, on
/// its line, while the end itself lies on that other bond's line.
fn bond_near_end(
    sketch: &Sketch,
    j: usize,
    frame: &BondFrame,
    end: Point,
    at_b: bool,
    avg: f64,
    maxh: f64,
    max_dist_double: f64,
) -> Option<usize> {
    let y_dist = slack(sketch, j, maxh, max_dist_double);
    let (ja, jb) = (sketch.bonds[j].a, sketch.bonds[j].b);
    let mut best = f64::MAX;
    let mut hit = None;
    for i in 0..sketch.bonds.len() {
        if i == j || !sketch.bonds[i].exists {
            continue;
        }
        let Some(other) = sketch.bond_frame(i) else {
            continue;
        };
        if !(other.offset(end).abs() < slack(sketch, i, maxh, max_dist_double)) {
            continue;
        }
        for k in [sketch.bonds[i].a, sketch.bonds[i].b] {
            if k == ja || k == jb {
                continue;
            }
            let p = sketch.point(k);
            let d = if at_b { frame.along_from_end(p) } else { frame.along(p) };
            let ahead = if at_b {
                d > -frame.length() / 2.0
            } else {
                d < frame.length() / 2.0
            };
            if d.abs() <= avg / 2.0 && frame.offset(p).abs() <= y_dist && d.abs() < best && ahead {
                best = d.abs();
                hit = Some(k);
            }
        }
    }
    hit
}

/// Joins free bond ends to the nearest atom of another bond lying ahead on
/// the same line, closing gaps left where strokes cross or touch.
pub fn extend_terminal_bond_to_bonds(
    sketch: &mut Sketch,
    avg: f64,
    maxh: f64,
    max_dist_double: f64,
    tolerances: &Tolerances,
) {
    settle("extend_terminal_bond_to_bonds", tolerances.max_sweeps, || {
        let mut found = false;
        for j in 0..sketch.bonds.len() {
            if !sketch.bonds[j].exists {
                continue;
            }
            let (a, b) = (sketch.bonds[j].a, sketch.bonds[j].b);
            let (loose_a, loose_b) = (sketch.terminal_bond(a, j), sketch.terminal_bond(b, j));
            let Some(frame) = sketch.bond_frame(j) else {
                continue;
            };
            let (pa, pb) = (sketch.point(a), sketch.point(b));

            if loose_a {
                if let Some(l) = bond_near_end(sketch, j, &frame, pa, false, avg, maxh, max_dist_double) {
                    let merged = pa.midpoint(sketch.point(l));
                    sketch.atoms[l].set_point(merged);
                    sketch.bonds[j].a = l;
                    found = true;
                }
            }
            if loose_b {
                if let Some(l) = bond_near_end(sketch, j, &frame, pb, true, avg, maxh, max_dist_double) {
                    let merged = pb.midpoint(sketch.point(l));
                    sketch.atoms[l].set_point(merged);
                    sketch.bonds[j].b = l;
                    found = true;
                }
            }
        }
        found
    });
}

/// Straightens one end of bond `i`: when exactly one other bond meets the
/// unlabeled end and continues outward within `maxh` of `i`'s line, the two
/// bonds become one.
fn flatten_end(sketch: &mut Sketch, i: usize, at_b: bool, maxh: f64) -> bool {
    let end = if at_b { sketch.bonds[i].b } else { sketch.bonds[i].a };
    if sketch.atoms[end].label.is_some() {
        return false;
    }
    let mut neighbors = (0..sketch.bonds.len()).filter(|&j| {
        let b = &sketch.bonds[j];
        j != i && b.exists && b.order < 3 && b.touches(end)
    });
    let (Some(f), None) = (neighbors.next(), neighbors.next()) else {
        return false;
    };
    let Some(frame) = sketch.bond_frame(i) else {
        return false;
    };

    let shared_is_b = sketch.bonds[f].b == end;
    let far = if shared_is_b { sketch.bonds[f].a } else { sketch.bonds[f].b };
    let p = sketch.point(far);
    let outward = if at_b {
        frame.along_from_end(p) > 0.0
    } else {
        frame.along(p) < 0.0
    };
    if !(frame.offset(p).abs() <= maxh && outward) {
        return false;
    }

    let longer = sketch.bond_length(f) > frame.length();
    let absorbed = sketch.bonds[f].clone();
    sketch.bonds[f].exists = false;
    sketch.atoms[end].exists = false;
    let styled = absorbed.hash || absorbed.wedge;
    let bond = &mut sketch.bonds[i];
    match (at_b, shared_is_b) {
        (false, true) => bond.a = far,
        (false, false) if styled => {
            bond.a = bond.b;
            bond.b = far;
        }
        (false, false) => bond.a = far,
        (true, true) if styled => {
            bond.b = bond.a;
            bond.a = far;
        }
        (true, true) => bond.b = far,
        (true, false) => bond.b = far,
    }
    if longer {
        bond.order = absorbed.order;
    }
    bond.arom |= absorbed.arom;
    bond.hash |= absorbed.hash;
    bond.wedge |= absorbed.wedge;
    true
}

/// Merges pairs of nearly collinear bonds meeting at an unlabeled atom of
/// degree two, keeping the longer bond's order and either bond's style.
pub fn flatten_bonds(sketch: &mut Sketch, maxh: f64, tolerances: &Tolerances) {
    settle("flatten_bonds", tolerances.max_sweeps, || {
        let mut found = false;
        for i in 0..sketch.bonds.len() {
            if !sketch.bonds[i].exists || sketch.bonds[i].order >= 3 {
                continue;
            }
            found |= flatten_end(sketch, i, false, maxh);
            found |= flatten_end(sketch, i, true, maxh);
        }
        found
    });
}

/// Merges atoms closer than `dist` into their midpoint.
///
/// The surviving atom keeps its label, or adopts the merged atom's label
/// when it had none, and bonds are retargeted to it. Repeats until no pair
/// is closer than `dist`.
pub fn collapse_atoms(sketch: &mut Sketch, dist: f64, tolerances: &Tolerances) {
    settle("collapse_atoms", tolerances.max_sweeps, || {
        let mut found = false;
        for i in 0..sketch.atoms.len() {
            if !sketch.atoms[i].exists {
                continue;
            }
            for j in 0..sketch.atoms.len() {
                if j == i || !sketch.atoms[j].exists || sketch.point(i).distance(sketch.point(j)) >= dist {
                    continue;
                }
                sketch.atoms[j].exists = false;
                let merged = sketch.point(i).midpoint(sketch.point(j));
                sketch.atoms[i].set_point(merged);
                if sketch.atoms[i].label.is_none() {
                    sketch.atoms[i].label = sketch.atoms[j].label.clone();
                }
                sketch.retarget(j, i);
                found = true;
            }
        }
        found
    });
}

/// Pulls the ends of bonds shorter than `dist` together.
pub fn collapse_bonds(sketch: &mut Sketch, dist: f64) {
    for i in 0..sketch.bonds.len() {
        if sketch.bonds[i].exists && sketch.bond_length(i) < dist {
            let (a, b) = (sketch.bonds[i].a, sketch.bonds[i].b);
            pull_together(sketch, a, b);
        }
    }
}

/// Splits bond `i` where an end of the crossing bond `j` touches it.
fn split_at_touch(sketch: &mut Sketch, i: usize, j: usize, thickness: f64) -> Result<(), Error> {
    let Some(frame) = sketch.bond_frame(i) else {
        return Ok(());
    };
    let (ia, ib) = (sketch.bonds[i].a, sketch.bonds[i].b);
    let (ja, jb) = (sketch.bonds[j].a, sketch.bonds[j].b);
    let is_end = |k: usize| k == ia || k == ib;
    let (touch, other) = if frame.offset(sketch.point(ja)).abs() < thickness && !is_end(ja) {
        (ja, jb)
    } else if frame.offset(sketch.point(jb)).abs() < thickness && !is_end(jb) {
        (jb, ja)
    } else {
        return Ok(());
    };
    let along = frame.along(sketch.point(touch));
    if !(along > 0.0 && along < frame.length()) {
        return Ok(());
    }
    if is_end(other) {
        sketch.bonds[j].exists = false;
        return Ok(());
    }

    let source = sketch.bonds[i].clone();
    let k = sketch.add_bond(touch, ib, source.path)?;
    let tail = &mut sketch.bonds[k];
    tail.order = source.order;
    tail.hash = source.hash;
    tail.wedge = source.wedge;
    tail.arom = source.arom;
    tail.conjoined = source.conjoined;
    sketch.bonds[i].b = touch;
    sketch.bonds[i].wedge = false;
    Ok(())
}

/// Splits bonds at T-junctions where another, non-parallel bond ends on
/// them within `thickness`. Both bonds must be longer than a third of
/// `avg`; triple bonds are left alone.
pub fn fix_one_sided_bonds(
    sketch: &mut Sketch,
    thickness: f64,
    avg: f64,
    tolerances: &Tolerances,
) -> Result<(), Error> {
    let eligible =
        |sketch: &Sketch, k: usize| sketch.bonds[k].exists && sketch.bonds[k].order < 3 && sketch.bond_length(k) > avg / 3.0;
    let mut i = 0;
    while i < sketch.bonds.len() {
        let mut j = 0;
        while eligible(sketch, i) && j < sketch.bonds.len() {
            if j != i
                && eligible(sketch, j)
                && sketch.bond_cosine(i, j).abs() < tolerances.parallel_cosine
            {
                split_at_touch(sketch, i, j, thickness)?;
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

/// Retires the stub bond `j` together with its loose end `stub`, passing a
/// label on to the atom it hung from.
fn drop_stub(sketch: &mut Sketch, j: usize, stub: usize, anchor: usize) {
    sketch.bonds[j].exists = false;
    sketch.atoms[stub].exists = false;
    if sketch.atoms[anchor].label.is_some() {
        return;
    }
    if let Some(label) = sketch.atoms[stub].label.clone() {
        sketch.atoms[anchor].label = Some(label);
        return;
    }
    let dashed = sketch
        .bonds
        .iter()
        .enumerate()
        .any(|(i, b)| i != j && b.exists && b.hash && b.touches(anchor));
    if !dashed {
        sketch.atoms[anchor].label = Some(UNKNOWN_LABEL.to_string());
    }
}

/// Removes plain single bonds shorter than a third of `avg` that dangle
/// from the structure.
pub fn remove_small_terminal_bonds(sketch: &mut Sketch, avg: f64, tolerances: &Tolerances) {
    settle("remove_small_terminal_bonds", tolerances.max_sweeps, || {
        let mut found = false;
        for j in 0..sketch.bonds.len() {
            let bond = &sketch.bonds[j];
            if !bond.exists || !bond.is_plain_single() || bond.arom || sketch.bond_length(j) >= avg / 3.0 {
                continue;
            }
            let (a, b) = (bond.a, bond.b);
            let (loose_a, loose_b) = (sketch.terminal_bond(a, j), sketch.terminal_bond(b, j));
            if loose_a {
                drop_stub(sketch, j, a, b);
                found = true;
            }
            if loose_b {
                drop_stub(sketch, j, b, a);
                found = true;
            }
        }
        found
    });
}

/// Flags atoms at the free end of a non-aromatic single bond.
pub fn mark_terminal_atoms(sketch: &mut Sketch) {
    for atom in sketch.atoms.iter_mut() {
        atom.terminal = false;
    }
    for j in 0..sketch.bonds.len() {
        let bond = &sketch.bonds[j];
        if !bond.exists || bond.order != 1 || bond.arom {
            continue;
        }
        let (a, b) = (bond.a, bond.b);
        if sketch.terminal_bond(a, j) {
            sketch.atoms[a].terminal = true;
        }
        if sketch.terminal_bond(b, j) {
            sketch.atoms[b].terminal = true;
        }
    }
}

/// Bridges small gaps between at most three fragments.
///
/// For each pair of fragments with more than two atoms, the closest atom
/// pair is bonded when their distance is between a third of `avg` and
/// `1.1 * avg`; closer pairs are instead made coincident.
pub fn reconnect_fragments(sketch: &mut Sketch, avg: f64) -> Result<(), Error> {
    let fragments = find_fragments(sketch);
    if fragments.len() > 3 {
        return Ok(());
    }
    let mut bridged = 0usize;
    for (i, first) in fragments.iter().enumerate() {
        if first.len() <= 2 {
            continue;
        }
        for second in fragments[i + 1..].iter().filter(|f| f.len() > 2) {
            let mut closest = (f64::MAX, 0, 0);
            for &p in first {
                for &q in second {
                    let d = sketch.point(p).distance(sketch.point(q));
                    if d < closest.0 {
                        closest = (d, p, q);
                    }
                }
            }
            let (l, p, q) = closest;
            if l < 1.1 * avg && l > avg / 3.0 {
                let path = sketch.atoms[p].path;
                sketch.add_bond(p, q, path)?;
                bridged += 1;
            }
            if l < avg / 3.0 {
                let at = sketch.point(p);
                sketch.atoms[q].set_point(at);
            }
        }
    }
    tracing::debug!(fragments = fragments.len(), bridged, "fragments reconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::letter::{Anchor, Label};
    use crate::model::sketch::tests::make_sketch;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn free_end_takes_nearby_letter() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0)], &[(0, 1)]);
        sketch.add_letter('o', 36.0, 0.0, 5.0).unwrap();
        extend_terminal_bond_to_label(&mut sketch, 15.0, 2.0, 5.0);

        assert_eq!(sketch.atoms[1].label.as_deref(), Some("O"));
        assert!(approx_eq(sketch.atoms[1].x, 36.0));
        assert_eq!(sketch.atoms[0].label, None);
    }

    #[test]
    fn free_end_takes_label_between_its_anchors() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0)], &[(0, 1)]);
        sketch.labels.push(Label {
            text: "OH".to_string(),
            letters: vec![],
            first: Anchor { x: 36.0, y: 0.0, r: 5.0 },
            last: Anchor { x: 44.0, y: 0.0, r: 5.0 },
        });
        extend_terminal_bond_to_label(&mut sketch, 15.0, 2.0, 5.0);

        assert_eq!(sketch.atoms[1].label.as_deref(), Some("OH"));
        assert!(approx_eq(sketch.atoms[1].x, 40.0));
    }

    #[test]
    fn broken_line_is_joined_across_the_gap() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (28.0, 0.0), (31.0, 0.0), (60.0, 0.0)], &[(0, 1), (2, 3)]);
        extend_terminal_bond_to_bonds(&mut sketch, 30.0, 2.0, 5.0, &Tolerances::default());

        assert_eq!(sketch.bonds[0].b, 2);
        assert!(approx_eq(sketch.atoms[2].x, 29.5));
    }

    #[test]
    fn kinked_chain_is_flattened() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (10.0, 1.0), (20.0, 0.0)], &[(1, 2), (0, 1)]);
        flatten_bonds(&mut sketch, 3.0, &Tolerances::default());

        assert_eq!((sketch.bonds[0].a, sketch.bonds[0].b), (0, 2));
        assert!(!sketch.bonds[1].exists);
        assert!(!sketch.atoms[1].exists);
    }

    #[test]
    fn labeled_vertex_is_not_flattened() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (10.0, 1.0), (20.0, 0.0)], &[(1, 2), (0, 1)]);
        sketch.atoms[1].label = Some("O".to_string());
        flatten_bonds(&mut sketch, 3.0, &Tolerances::default());
        assert!(sketch.bonds[1].exists);
    }

    #[test]
    fn collapse_atoms_merges_and_is_idempotent() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (1.0, 0.0), (30.0, 0.0)], &[(0, 2), (1, 2)]);
        sketch.atoms[1].label = Some("N".to_string());
        let tolerances = Tolerances::default();

        collapse_atoms(&mut sketch, 3.0, &tolerances);
        let after = sketch.clone();
        assert_eq!(sketch.count_atoms(), 2);
        assert_eq!(sketch.atoms[0].label.as_deref(), Some("N"));
        assert!(approx_eq(sketch.atoms[0].x, 0.5));
        assert_eq!(sketch.bonds[1].a, 0);

        collapse_atoms(&mut sketch, 3.0, &tolerances);
        assert_eq!(sketch.atoms.as_slice(), after.atoms.as_slice());
        assert_eq!(sketch.bonds.as_slice(), after.bonds.as_slice());
    }

    #[test]
    fn short_bond_ends_are_pulled_together() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (4.0, 0.0)], &[(0, 1)]);
        collapse_bonds(&mut sketch, 5.0);
        assert!(approx_eq(sketch.atoms[0].x, 2.0));
        assert!(approx_eq(sketch.atoms[1].x, 3.0));
    }

    #[test]
    fn t_junction_splits_the_crossed_bond() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (40.0, 0.0), (20.0, 1.0), (20.0, 30.0)], &[(0, 1), (2, 3)]);
        fix_one_sided_bonds(&mut sketch, 2.0, 30.0, &Tolerances::default()).unwrap();

        assert_eq!(sketch.count_bonds().0, 3);
        assert_eq!(sketch.bonds[0].b, 2);
        assert_eq!((sketch.bonds[2].a, sketch.bonds[2].b), (2, 1));
    }

    #[test]
    fn labeled_stub_passes_its_label_on() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0), (33.0, 0.0)], &[(0, 1), (1, 2)]);
        sketch.atoms[2].label = Some("O".to_string());
        remove_small_terminal_bonds(&mut sketch, 30.0, &Tolerances::default());

        assert!(!sketch.bonds[1].exists);
        assert!(!sketch.atoms[2].exists);
        assert_eq!(sketch.atoms[1].label.as_deref(), Some("O"));
    }

    #[test]
    fn unlabeled_stub_marks_unknown_atom() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0), (33.0, 0.0)], &[(0, 1), (1, 2)]);
        remove_small_terminal_bonds(&mut sketch, 30.0, &Tolerances::default());
        assert_eq!(sketch.atoms[1].label.as_deref(), Some(UNKNOWN_LABEL));
    }

    #[test]
    fn chain_ends_are_terminal() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (30.0, 0.0), (60.0, 0.0)], &[(0, 1), (1, 2)]);
        mark_terminal_atoms(&mut sketch);
        let flags: Vec<bool> = sketch.atoms.iter().map(|a| a.terminal).collect();
        assert_eq!(flags, [true, false, true]);
    }

    #[test]
    fn nearby_fragments_are_bridged() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (30.0, 0.0), (60.0, 0.0), (80.0, 0.0), (110.0, 0.0), (140.0, 0.0)],
            &[(0, 1), (1, 2), (3, 4), (4, 5)],
        );
        reconnect_fragments(&mut sketch, 30.0).unwrap();

        assert_eq!(sketch.count_bonds().0, 5);
        let added = &sketch.bonds[4];
        assert!(added.touches(2) && added.touches(3));
    }
}
