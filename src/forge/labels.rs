//! Grouping recognized letters into multi-letter labels and turning label
//! text into formal charges.

use super::dictionary::Dictionary;
use crate::model::letter::{Anchor, Label, Letter};
use crate::model::sketch::Sketch;

/// Anchor of a label with no alphabetic member; never closest to anything.
const UNSET: Anchor = Anchor {
    x: f64::MAX,
    y: f64::MAX,
    r: 0.0,
};

/// Two letters belong to the same label.
///
/// Letters on one baseline join when closer than twice the larger radius;
/// a digit may sit lower (a subscript) by up to the sum of the radii. Charge
/// signs join anything within one and a half radii sums.
fn adjacent(p: &Letter, q: &Letter) -> bool {
    let d = p.point().distance(q.point());
    let dy = (p.y - q.y).abs();
    let aligned = dy < p.r.min(q.r)
        || (dy < p.r + q.r
            && ((p.y < q.y && q.ch.is_ascii_digit()) || (q.y < p.y && p.ch.is_ascii_digit())));
    (d < 2.0 * p.r.max(q.r) && aligned)
        || (d < 1.5 * (p.r + q.r) && (p.is_sign() || q.is_sign()))
}

/// Letters that can anchor a bond: not a digit and not a charge sign.
fn anchors_bond(letter: &Letter) -> bool {
    !letter.ch.is_ascii_digit() && !letter.is_sign()
}

fn anchor_of(letter: &Letter) -> Anchor {
    Anchor {
        x: letter.x,
        y: letter.y,
        r: letter.r,
    }
}

/// Builds one label by following letter pairs `start, start + 1, ...` whose
/// first letter is the previous pair's second.
fn chain_label(letters: &[Letter], pairs: &mut [(usize, usize, bool)], start: usize) -> Label {
    let mut label = Label {
        first: UNSET,
        last: UNSET,
        ..Default::default()
    };
    let mut found_first = false;
    let mut visit = |label: &mut Label, k: usize| {
        let letter = &letters[k];
        if anchors_bond(letter) {
            if !found_first {
                label.first = anchor_of(letter);
                found_first = true;
            }
            label.last = anchor_of(letter);
        }
    };

    let (a, b, _) = pairs[start];
    label.text.push(letters[a].ch);
    label.text.push(letters[b].ch);
    label.letters.extend([a, b]);
    visit(&mut label, a);
    visit(&mut label, b);
    pairs[start].2 = false;

    let mut last = b;
    for pair in pairs[start + 1..].iter_mut() {
        if !pair.2 || pair.0 != last {
            continue;
        }
        label.text.push(letters[pair.1].ch);
        label.letters.push(pair.1);
        visit(&mut label, pair.0);
        visit(&mut label, pair.1);
        last = pair.1;
        pair.2 = false;
    }
    label
}

/// Splits a label whose alphabetic letters spread over two lines, as when
/// `OH` is written above `HN`. Letters below the mean height stay in
/// `label`; the rest are returned as a new label.
fn split_stacked(letters: &[Letter], label: &mut Label) -> Option<Label> {
    let alpha: Vec<&Letter> = label
        .letters
        .iter()
        .map(|&k| &letters[k])
        .filter(|l| l.ch.is_alphabetic())
        .collect();
    if alpha.is_empty() {
        return None;
    }
    let cy = alpha.iter().map(|l| l.y).sum::<f64>() / alpha.len() as f64;
    if alpha.iter().filter(|l| l.y - cy > l.r / 2.0).count() <= 1 {
        return None;
    }

    let empty = || Label {
        first: UNSET,
        last: Anchor { x: 0.0, ..UNSET },
        ..Default::default()
    };
    let (mut lower, mut upper) = (empty(), empty());
    for &k in &label.letters {
        let letter = &letters[k];
        let part = if letter.y > cy { &mut lower } else { &mut upper };
        part.text.push(letter.ch);
        part.letters.push(k);
        if letter.ch.is_alphabetic() {
            if letter.x < part.first.x {
                part.first = anchor_of(letter);
            }
            if letter.x > part.last.x {
                part.last = anchor_of(letter);
            }
        }
    }
    *label = lower;
    Some(upper)
}

/// Moves every `+` and `-` to the end of the text, so `+N` reads `N+`.
fn strip_charges(text: &mut String) {
    let mut charges = String::new();
    loop {
        let mut moved = false;
        for sign in ['-', '+'] {
            if let Some(pos) = text.find(sign) {
                text.remove(pos);
                charges.push(sign);
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    text.push_str(&charges);
}

/// Groups the sketch's letters into labels.
///
/// Letters are sorted left to right; each letter pairs with the first later
/// letter adjacent to it, and labels follow chains of such pairs. Letters
/// that join a label are no longer free. Stacked labels are split in two and
/// charge signs are moved to the end of the text.
///
/// The resulting labels replace `sketch.labels`.
pub fn assemble_labels(sketch: &mut Sketch) {
    sketch.letters.sort_by(|p, q| p.x.total_cmp(&q.x));

    let n = sketch.letters.len();
    let mut pairs: Vec<(usize, usize, bool)> = Vec::new();
    for i in 0..n {
        let partner = (i + 1..n).find(|&j| adjacent(&sketch.letters[i], &sketch.letters[j]));
        if let Some(j) = partner {
            pairs.push((i, j, true));
            sketch.letters[i].free = false;
            sketch.letters[j].free = false;
        }
    }
    let letters = sketch.letters.as_slice();
    pairs.sort_by(|p, q| letters[p.0].x.total_cmp(&letters[q.0].x));

    let mut labels = Vec::new();
    for start in 0..pairs.len() {
        if pairs[start].2 {
            labels.push(chain_label(letters, &mut pairs, start));
        }
    }

    let chained = labels.len();
    for i in 0..chained {
        if let Some(upper) = split_stacked(letters, &mut labels[i]) {
            labels.push(upper);
        }
    }
    for label in &mut labels {
        strip_charges(&mut label.text);
    }
    tracing::debug!(letters = n, labels = labels.len(), "labels assembled");
    sketch.labels = labels;
}

/// Derives formal charges from atom labels and normalizes the labels.
///
/// Bonds with a missing end are retired first. Every `+`/`-` in a label is
/// removed and, when the remaining label starts with a letter, counted into
/// the atom's charge. The wide end of a hash bond carries no charge. The
/// stripped label is then normalized with `dictionary`, given the atom's
/// bond order sum.
pub fn assign_charge(sketch: &mut Sketch, dictionary: &Dictionary) {
    for i in sketch.dangling_bonds() {
        sketch.bonds[i].exists = false;
    }
    for i in 0..sketch.atoms.len() {
        if !sketch.atoms[i].exists {
            continue;
        }
        let valence: u32 = sketch
            .bonds
            .iter()
            .filter(|b| b.exists && b.touches(i))
            .map(|b| u32::from(b.order))
            .sum();
        let hash_end = sketch.bonds.iter().any(|b| b.exists && b.hash && b.b == i);

        let atom = &mut sketch.atoms[i];
        atom.charge = 0;
        let Some(label) = atom.label.as_mut() else {
            continue;
        };
        // Minus signs are stripped before plus signs; a sign only counts
        // when the remaining label starts with a letter.
        for (sign, delta) in [('-', -1), ('+', 1)] {
            while let Some(pos) = label.find(sign) {
                label.remove(pos);
                if label.starts_with(|c: char| c.is_alphabetic()) {
                    atom.charge += delta;
                }
            }
        }
        if hash_end {
            atom.charge = 0;
        }
        *label = dictionary.normalize(label, valence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::dictionary::default_dictionary;
    use crate::model::sketch::tests::make_sketch;

    fn make_letters(letters: &[(char, f64, f64, f64)]) -> Sketch {
        let mut sketch = Sketch::new(100);
        for &(ch, x, y, r) in letters {
            sketch.add_letter(ch, x, y, r).unwrap();
        }
        sketch
    }

    #[test]
    fn methyl_letters_form_one_label() {
        let mut sketch = make_letters(&[('H', 18.0, 20.0, 5.0), ('3', 24.0, 23.0, 4.0), ('C', 10.0, 20.0, 5.0)]);
        assemble_labels(&mut sketch);

        assert_eq!(sketch.labels.len(), 1);
        let label = &sketch.labels[0];
        assert_eq!(label.text, "CH3");
        assert_eq!(label.first.x, 10.0);
        assert_eq!(label.last.x, 18.0);
        assert!(sketch.letters.iter().all(|l| !l.free));
    }

    #[test]
    fn distant_letters_stay_free() {
        let mut sketch = make_letters(&[('N', 10.0, 20.0, 5.0), ('O', 60.0, 20.0, 5.0)]);
        assemble_labels(&mut sketch);
        assert!(sketch.labels.is_empty());
        assert!(sketch.letters.iter().all(|l| l.free));
    }

    #[test]
    fn leading_sign_moves_to_the_end() {
        let mut sketch = make_letters(&[('+', 3.0, 15.0, 3.0), ('N', 10.0, 20.0, 5.0)]);
        assemble_labels(&mut sketch);

        assert_eq!(sketch.labels[0].text, "N+");
        assert_eq!(sketch.labels[0].first.x, 10.0);
    }

    #[test]
    fn drifting_label_is_split_in_two() {
        let mut sketch = make_letters(&[
            ('O', 10.0, 10.0, 6.0),
            ('H', 16.0, 14.0, 6.0),
            ('N', 22.0, 18.0, 6.0),
            ('M', 28.0, 22.0, 6.0),
            ('e', 34.0, 26.0, 6.0),
        ]);
        assemble_labels(&mut sketch);

        let texts: Vec<&str> = sketch.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["Me", "OHN"]);
        assert_eq!(sketch.labels[0].first.x, 28.0);
        assert_eq!(sketch.labels[1].last.x, 22.0);
    }

    #[test]
    fn charge_comes_from_label_signs() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)], &[(0, 1), (1, 2)]);
        sketch.atoms[1].label = Some("N+".to_string());
        sketch.atoms[2].label = Some("O-".to_string());
        assign_charge(&mut sketch, default_dictionary());

        assert_eq!(sketch.atoms[1].charge, 1);
        assert_eq!(sketch.atoms[1].label.as_deref(), Some("N"));
        assert_eq!(sketch.atoms[2].charge, -1);
        assert_eq!(sketch.atoms[0].label, None);
    }

    #[test]
    fn every_sign_is_stripped_minus_first() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0), (60.0, 0.0)],
            &[(0, 1), (1, 2), (2, 3)],
        );
        sketch.atoms[0].label = Some("O--".to_string());
        sketch.atoms[1].label = Some("N+-".to_string());
        sketch.atoms[2].label = Some("+-N".to_string());
        assign_charge(&mut sketch, default_dictionary());

        let labels: Vec<Option<&str>> = sketch.atoms.iter().take(3).map(|a| a.label.as_deref()).collect();
        assert_eq!(labels, [Some("O"), Some("N"), Some("N")]);
        assert_eq!(sketch.atoms[0].charge, -2);
        assert_eq!(sketch.atoms[1].charge, 0);
        assert_eq!(sketch.atoms[2].charge, 1);
    }

    #[test]
    fn hash_wide_end_is_neutral_and_label_is_corrected() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (20.0, 0.0)], &[(0, 1)]);
        sketch.bonds[0].hash = true;
        sketch.atoms[1].label = Some("Ci-".to_string());
        assign_charge(&mut sketch, default_dictionary());

        assert_eq!(sketch.atoms[1].charge, 0);
        assert_eq!(sketch.atoms[1].label.as_deref(), Some("Cl"));
    }

    #[test]
    fn bonds_to_missing_atoms_are_retired() {
        let mut sketch = make_sketch(&[(0.0, 0.0), (20.0, 0.0)], &[(0, 1)]);
        sketch.atoms[1].exists = false;
        assign_charge(&mut sketch, default_dictionary());
        assert!(!sketch.bonds[0].exists);
    }
}
