//! Connected fragments of a sketch, bridge-bond resolution, and conversion
//! of a fragment into a self-contained [`Molecule`].

use std::cmp::Ordering;
use std::collections::VecDeque;

use super::cleanup::remove_zero_bonds;
use super::dictionary::Dictionary;
use super::statistics::{molecule_statistics, sketch_statistics};
use crate::model::bond::Bond;
use crate::model::molecule::{
    BondStyle, BoundingBox, Fragment, Molecule, MoleculeAtom, MoleculeBond,
};
use crate::model::sketch::Sketch;

/// Groups the atoms of existing bonds into connected components.
///
/// Bonds are drawn from a work pool; each fragment starts from the last
/// pooled bond and absorbs every pooled bond sharing an atom with it until a
/// sweep adds nothing. Atoms appear in the order they joined.
pub fn find_fragments(sketch: &Sketch) -> Vec<Vec<usize>> {
    let mut pool: Vec<usize> = sketch
        .existing_bonds()
        .filter(|&i| {
            let b = &sketch.bonds[i];
            sketch.atoms[b.a].exists && sketch.atoms[b.b].exists
        })
        .collect();

    let mut fragments = Vec::new();
    while let Some(seed) = pool.pop() {
        let bond = &sketch.bonds[seed];
        let mut members = vec![bond.a, bond.b];
        let mut grew = true;
        while grew {
            grew = false;
            pool.retain(|&i| {
                let b = &sketch.bonds[i];
                match (members.contains(&b.a), members.contains(&b.b)) {
                    (true, true) => false,
                    (true, false) => {
                        members.push(b.b);
                        grew = true;
                        false
                    }
                    (false, true) => {
                        members.push(b.a);
                        grew = true;
                        false
                    }
                    (false, false) => true,
                }
            });
        }
        fragments.push(members);
    }
    fragments
}

/// Attaches an integer bounding box to each atom group.
pub fn populate_fragments(sketch: &Sketch, groups: Vec<Vec<usize>>) -> Vec<Fragment> {
    groups
        .into_iter()
        .map(|atoms| {
            let mut bbox = BoundingBox::new(i32::MAX, i32::MAX, 0, 0);
            for &k in &atoms {
                let (x, y) = (sketch.atoms[k].x as i32, sketch.atoms[k].y as i32);
                bbox.x1 = bbox.x1.min(x);
                bbox.x2 = bbox.x2.max(x);
                bbox.y1 = bbox.y1.min(y);
                bbox.y2 = bbox.y2.max(y);
            }
            Fragment { atoms, bbox }
        })
        .collect()
}

/// Stable reading-order sort of boxed items: rows top to bottom, then left
/// to right.
///
/// Reading order is not transitive for staggered boxes, so this is a plain
/// insertion sort rather than `slice::sort_by`.
pub fn sort_reading_order<T>(items: &mut [T], bbox: impl Fn(&T) -> BoundingBox) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && bbox(&items[j - 1]).reading_order(&bbox(&items[j])) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Connected fragments of the sketch with their boxes, in reading order.
pub fn fragments_in_reading_order(sketch: &Sketch) -> Vec<Fragment> {
    let mut fragments = populate_fragments(sketch, find_fragments(sketch));
    sort_reading_order(&mut fragments, |f| f.bbox);
    fragments
}

fn far_end(bond: &Bond, atom: usize) -> usize {
    if bond.a == atom { bond.b } else { bond.a }
}

/// Both ends of `other` lie within `thickness` of `bond`'s line.
fn on_line(sketch: &Sketch, bond: usize, other: usize, thickness: f64) -> bool {
    let Some(frame) = sketch.bond_frame(bond) else {
        return false;
    };
    let (p, q) = sketch.bond_points(other);
    frame.offset(p).abs() <= thickness && frame.offset(q).abs() <= thickness
}

/// Pairs the four bonds at a crossing into two straight lines `(a, b)` and
/// `(c, d)`, or `None` when they do not pair up.
fn crossing_lines(sketch: &Sketch, center: usize, thickness: f64) -> Option<[usize; 4]> {
    let mut con: VecDeque<usize> = sketch
        .existing_bonds()
        .filter(|&j| sketch.bonds[j].touches(center))
        .collect();
    if con.len() != 4 {
        return None;
    }
    let a = con.pop_front()?;
    let mut b = None;
    let mut tries = 0;
    while con.len() > 2 && tries < 3 {
        tries += 1;
        let candidate = con.pop_front()?;
        if on_line(sketch, a, candidate, thickness) {
            b = Some(candidate);
        } else {
            con.push_back(candidate);
        }
    }
    let b = b?;
    let (c, d) = (con[0], con[1]);

    let plain = [a, b, c, d].iter().all(|&j| {
        let bond = &sketch.bonds[j];
        bond.order == 1 && !sketch.terminal_bond(bond.a, j) && !sketch.terminal_bond(bond.b, j)
    });
    let straight = sketch.bond_frame(c).is_some_and(|frame| {
        let (p, q) = sketch.bond_points(d);
        frame.offset(p).abs() < thickness && frame.offset(q).abs() < thickness
    });
    (plain && straight).then_some([a, b, c, d])
}

/// Splits unlabeled four-way crossings into two bonds passing over each
/// other.
///
/// A crossing atom whose four single bonds form two straight lines is
/// removed; each line becomes one bond joining its far atoms. The split is
/// undone unless fragment and rotor counts are unchanged and the number of
/// five- and six-membered rings did not drop by exactly two.
///
/// Returns the fragment count of the sketch.
pub fn resolve_bridge_bonds(sketch: &mut Sketch, thickness: f64) -> usize {
    let mut stats = sketch_statistics(sketch);
    let mut resolved = 0usize;

    for center in 0..sketch.atoms.len() {
        if !sketch.atoms[center].exists || sketch.atoms[center].is_labeled() {
            continue;
        }
        let Some([a, b, c, d]) = crossing_lines(sketch, center, thickness) else {
            continue;
        };

        let snapshot = (sketch.atoms.clone(), sketch.bonds.clone());
        let through_b = far_end(&sketch.bonds[b], center);
        let through_d = far_end(&sketch.bonds[d], center);
        sketch.bonds[b].exists = false;
        sketch.bonds[d].exists = false;
        sketch.atoms[center].exists = false;
        for (bond, through) in [(a, through_b), (c, through_d)] {
            let bond = &mut sketch.bonds[bond];
            if bond.a == center {
                bond.a = through;
            } else {
                bond.b = through;
            }
        }

        let split = sketch_statistics(sketch);
        let lost_rings = stats.rings56 as isize - split.rings56 as isize;
        if split.fragments != stats.fragments || split.rotors != stats.rotors || lost_rings == 2 {
            (sketch.atoms, sketch.bonds) = snapshot;
        } else {
            stats = split;
            resolved += 1;
        }
    }
    tracing::debug!(resolved, fragments = stats.fragments, "bridge bonds resolved");
    stats.fragments
}

fn bond_style(bond: &Bond) -> BondStyle {
    if bond.wedge {
        BondStyle::Wedge
    } else if bond.hash {
        BondStyle::Hash
    } else if bond.up {
        BondStyle::Up
    } else if bond.down {
        BondStyle::Down
    } else {
        BondStyle::Plain
    }
}

/// Extracts one fragment as a compact molecule in region coordinates.
///
/// Atoms outside the fragment are hidden on a copy of the sketch so that
/// bonds leaving the fragment drop out; labels that name a known
/// abbreviation carry its expansion.
pub fn fragment_molecule(
    sketch: &Sketch,
    fragment: &Fragment,
    avg: f64,
    dictionary: &Dictionary,
) -> Molecule {
    let mut local = sketch.clone();
    for (k, atom) in local.atoms.iter_mut().enumerate() {
        atom.exists = atom.exists && fragment.atoms.contains(&k);
    }
    remove_zero_bonds(&mut local);

    let mut index = vec![None; local.atoms.len()];
    let mut atoms = Vec::new();
    for k in local.existing_atoms() {
        let atom = &local.atoms[k];
        index[k] = Some(atoms.len());
        atoms.push(MoleculeAtom {
            x: atom.x,
            y: atom.y,
            label: atom.label.clone(),
            charge: atom.charge,
            expansion: atom
                .label
                .as_deref()
                .and_then(|l| dictionary.expansion(l))
                .map(str::to_string),
        });
    }
    let bonds = local
        .existing_bonds()
        .filter_map(|j| {
            let bond = &local.bonds[j];
            Some(MoleculeBond {
                a: index[bond.a]?,
                b: index[bond.b]?,
                order: bond.order,
                style: bond_style(bond),
                aromatic: bond.arom,
            })
        })
        .collect();

    let mut molecule = Molecule {
        atoms,
        bonds,
        avg_bond_length: avg,
        ..Default::default()
    };
    molecule.statistics = molecule_statistics(&molecule);
    molecule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::dictionary::default_dictionary;
    use crate::model::sketch::tests::make_sketch;

    /// A four-way crossing at atom 0 with arms of two atoms each:
    /// left 1, 2; right 3, 4; up 5, 6; down 7, 8.
    fn make_crossing(extra: &[(usize, usize)]) -> Sketch {
        let points = [
            (0.0, 0.0),
            (-20.0, 0.0),
            (-40.0, 0.0),
            (20.0, 0.0),
            (40.0, 0.0),
            (0.0, -20.0),
            (0.0, -40.0),
            (0.0, 20.0),
            (0.0, 40.0),
        ];
        let mut bonds = vec![(1, 0), (0, 3), (5, 0), (0, 7), (2, 1), (3, 4), (6, 5), (7, 8)];
        bonds.extend_from_slice(extra);
        make_sketch(&points, &bonds)
    }

    #[test]
    fn fragments_follow_shared_atoms() {
        let sketch = make_sketch(
            &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (50.0, 0.0), (60.0, 0.0)],
            &[(0, 1), (3, 4), (1, 2)],
        );
        let mut fragments = find_fragments(&sketch);
        for f in &mut fragments {
            f.sort();
        }
        fragments.sort();
        assert_eq!(fragments, vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn fragments_are_boxed_and_read_in_rows() {
        let sketch = make_sketch(
            &[(50.5, 0.0), (60.0, 10.0), (0.0, 5.0), (10.0, 8.0), (0.0, 40.0), (10.0, 50.0)],
            &[(0, 1), (2, 3), (4, 5)],
        );
        let fragments = fragments_in_reading_order(&sketch);
        let boxes: Vec<BoundingBox> = fragments.iter().map(|f| f.bbox).collect();
        assert_eq!(
            boxes,
            [
                BoundingBox::new(0, 5, 10, 8),
                BoundingBox::new(50, 0, 60, 10),
                BoundingBox::new(0, 40, 10, 50),
            ]
        );
    }

    #[test]
    fn crossing_outside_rings_is_rolled_back() {
        let mut sketch = make_crossing(&[]);
        let fragments = resolve_bridge_bonds(&mut sketch, 2.0);

        assert_eq!(fragments, 1);
        assert!(sketch.atoms[0].exists);
        assert_eq!(sketch.count_bonds().0, 8);
    }

    #[test]
    fn bent_crossing_is_not_paired() {
        let mut sketch = make_crossing(&[(2, 6), (4, 8), (6, 4)]);
        sketch.atoms[3].y = 10.0;
        assert_eq!(crossing_lines(&sketch, 0, 2.0), None);

        let atoms = sketch.count_atoms();
        let fragments = resolve_bridge_bonds(&mut sketch, 2.0);

        assert_eq!(fragments, 1);
        assert!(sketch.atoms[0].exists);
        assert_eq!(sketch.count_atoms(), atoms);
        assert_eq!(sketch.count_bonds().0, 11);
        assert!(sketch.bonds[1].touches(0) && sketch.bonds[1].touches(3));
    }

    #[test]
    fn crossing_inside_a_ring_system_is_split() {
        let mut sketch = make_crossing(&[(2, 6), (4, 8), (6, 4)]);
        let fragments = resolve_bridge_bonds(&mut sketch, 2.0);

        assert_eq!(fragments, 1);
        assert!(!sketch.atoms[0].exists);
        assert_eq!(sketch.count_bonds().0, 9);
        let horizontal = &sketch.bonds[0];
        assert!(horizontal.touches(1) && horizontal.touches(3));
        let vertical = &sketch.bonds[2];
        assert!(vertical.touches(5) && vertical.touches(7));
    }

    #[test]
    fn labeled_crossing_is_kept() {
        let mut sketch = make_crossing(&[(2, 6), (4, 8), (6, 4)]);
        sketch.atoms[0].label = Some("Si".to_string());
        resolve_bridge_bonds(&mut sketch, 2.0);
        assert!(sketch.atoms[0].exists);
    }

    #[test]
    fn molecule_keeps_only_its_fragment() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0), (90.0, 0.0), (110.0, 0.0)],
            &[(0, 1), (1, 2), (3, 4)],
        );
        sketch.atoms[2].label = Some("OMe".to_string());
        sketch.atoms[1].charge = 1;
        sketch.bonds[1].hash = true;
        let fragment = Fragment {
            atoms: vec![0, 1, 2],
            bbox: BoundingBox::new(0, 0, 40, 0),
        };
        let molecule = fragment_molecule(&sketch, &fragment, 20.0, default_dictionary());

        assert_eq!(molecule.atoms.len(), 3);
        assert_eq!(molecule.bonds.len(), 2);
        assert_eq!(molecule.bonds[1].style, BondStyle::Hash);
        assert_eq!(molecule.atoms[1].charge, 1);
        assert_eq!(molecule.atoms[2].expansion.as_deref(), Some("OC"));
        assert_eq!(molecule.statistics.fragments, 1);
        assert_eq!(molecule.avg_bond_length, 20.0);
    }
}
