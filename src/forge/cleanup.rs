//! Structural clean-up passes run between the heavier heuristics.
//!
//! Each pass restores the invariant that an existing bond has two distinct,
//! existing endpoints, or removes duplicates left behind by merges.

use crate::model::sketch::Sketch;

/// Representative bond length used when fewer than two bonds exist.
const FALLBACK_BOND_LENGTH: f64 = 10.0;

/// Retires atoms no existing bond touches.
pub fn remove_disconnected_atoms(sketch: &mut Sketch) {
    let mut connected = vec![false; sketch.atoms.len()];
    for bond in sketch.bonds.iter().filter(|b| b.exists) {
        connected[bond.a] = true;
        connected[bond.b] = true;
    }
    for (atom, connected) in sketch.atoms.iter_mut().zip(connected) {
        if atom.exists && !connected {
            atom.exists = false;
        }
    }
}

/// Retires duplicate bonds over the same atom pair, self-loops, and bonds
/// with a retired endpoint.
pub fn remove_zero_bonds(sketch: &mut Sketch) {
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists {
            continue;
        }
        for j in 0..sketch.bonds.len() {
            if j != i && sketch.bonds[j].exists && sketch.bonds[i].same_ends(&sketch.bonds[j]) {
                sketch.bonds[j].exists = false;
            }
        }
        let (a, b) = (sketch.bonds[i].a, sketch.bonds[i].b);
        if a == b || !sketch.atoms[a].exists || !sketch.atoms[b].exists {
            sketch.bonds[i].exists = false;
        }
    }
}

/// Folds duplicate bonds over the same atom pair into one, adding up their
/// orders.
pub fn collapse_doubleup_bonds(sketch: &mut Sketch) {
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists {
            continue;
        }
        for j in 0..sketch.bonds.len() {
            if j != i && sketch.bonds[j].exists && sketch.bonds[i].same_ends(&sketch.bonds[j]) {
                sketch.bonds[j].exists = false;
                sketch.bonds[i].order = sketch.bonds[i].order.saturating_add(1);
            }
        }
    }
}

/// 75th percentile of existing bond lengths: the working estimate of the
/// drawing's bond length.
pub fn percentile75(sketch: &Sketch) -> f64 {
    let mut lengths: Vec<f64> = sketch
        .existing_bonds()
        .map(|i| sketch.bond_length(i))
        .collect();
    if lengths.len() <= 1 {
        return FALLBACK_BOND_LENGTH;
    }
    lengths.sort_by(f64::total_cmp);
    lengths[3 * (lengths.len() - 1) / 4]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sketch::tests::make_sketch;

    #[test]
    fn disconnected_atoms_are_retired() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (10.0, 0.0), (50.0, 50.0)], &[(0, 1)]);
        remove_disconnected_atoms(&mut sketch);
        assert!(sketch.atoms[0].exists && sketch.atoms[1].exists);
        assert!(!sketch.atoms[2].exists);
    }

    #[test]
    fn zero_bonds_removes_duplicates_loops_and_dangling() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)],
            &[(0, 1), (1, 0), (2, 2), (1, 2)],
        );
        sketch.atoms[2].exists = false;
        remove_zero_bonds(&mut sketch);
        assert!(sketch.bonds[0].exists);
        assert!(!sketch.bonds[1].exists);
        assert!(!sketch.bonds[2].exists);
        assert!(!sketch.bonds[3].exists);
        assert!(sketch.dangling_bonds().is_empty());
    }

    #[test]
    fn doubleup_accumulates_order() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (10.0, 0.0)], &[(0, 1), (1, 0), (0, 1)]);
        collapse_doubleup_bonds(&mut sketch);
        assert_eq!(sketch.count_bonds(), (1, 3));
    }

    #[test]
    fn percentile_picks_upper_quartile() {
        let mut sketch = make_sketch(
            &[
                (0.0, 0.0),
                (10.0, 0.0),
                (0.0, 10.0),
                (20.0, 10.0),
                (0.0, 20.0),
                (30.0, 20.0),
                (0.0, 30.0),
                (40.0, 30.0),
                (0.0, 40.0),
                (50.0, 40.0),
            ],
            &[(0, 1), (2, 3), (4, 5), (6, 7), (8, 9)],
        );
        assert!((percentile75(&sketch) - 40.0).abs() < 1e-9);
        for b in sketch.bonds.iter_mut().skip(1) {
            b.exists = false;
        }
        assert_eq!(percentile75(&sketch), 10.0);
    }
}
