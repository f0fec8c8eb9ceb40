//! V2000 molfile output.
//!
//! [`MolfileBuilder`] serializes each accepted fragment as a molfile block,
//! [`write_sdf_record`] appends annotation data items and the record
//! delimiter, and [`RxnFormatter`] joins blocks into RXN reactions.

use std::collections::BTreeMap;
use std::io::Write;

use super::error::Error;
use crate::forge::{Annotations, MoleculeBuilder, ReactionFormatter, confidence};
use crate::model::molecule::{BondStyle, BuiltStructure, Molecule, RecognizedStructure};

const PROGRAM: &str = "sketch-forge";

/// Typical drawn C–C bond length in ångström; coordinates are scaled so the
/// average bond has this length.
const BOND_LENGTH: f64 = 1.54;

/// Whether a label can stand in the atom block as an element symbol.
fn is_element_symbol(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let rest: Vec<char> = chars.collect();
            rest.len() <= 1 && rest.iter().all(char::is_ascii_lowercase)
        }
        _ => false,
    }
}

fn bond_type(order: u8, aromatic: bool) -> u8 {
    if aromatic { 4 } else { order.clamp(1, 3) }
}

fn bond_stereo(style: BondStyle) -> u8 {
    match style {
        BondStyle::Wedge => 1,
        BondStyle::Hash => 6,
        BondStyle::Plain | BondStyle::Up | BondStyle::Down => 0,
    }
}

/// Hill-order summary of the atom labels, used as the block title.
///
/// Unlabeled vertices count as carbon; abbreviations are listed verbatim.
pub fn formula(molecule: &Molecule) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for atom in &molecule.atoms {
        *counts.entry(atom.label.as_deref().unwrap_or("C")).or_default() += 1;
    }
    let mut text = String::new();
    let mut push = |symbol: &str, n: usize| {
        text.push_str(symbol);
        if n > 1 {
            text.push_str(&n.to_string());
        }
    };
    for symbol in ["C", "H"] {
        if let Some(n) = counts.remove(symbol) {
            push(symbol, n);
        }
    }
    for (symbol, n) in counts {
        push(symbol, n);
    }
    text
}

/// Writes one molfile block, ending with `M  END`.
///
/// Coordinates are scaled to a [`BOND_LENGTH`] average bond with the y axis
/// pointing up. Labels that are not element symbols become `*` atoms with
/// an alias line.
pub fn write_molfile<W: Write>(mut writer: W, molecule: &Molecule, title: &str) -> Result<(), Error> {
    let scale = if molecule.avg_bond_length > 0.0 {
        BOND_LENGTH / molecule.avg_bond_length
    } else {
        1.0
    };

    writeln!(writer, "{title}")?;
    writeln!(writer, "  {PROGRAM}     2D")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
        molecule.atoms.len(),
        molecule.bonds.len()
    )?;

    let mut aliases = Vec::new();
    for (i, atom) in molecule.atoms.iter().enumerate() {
        let symbol = match atom.label.as_deref() {
            None => "C",
            Some(label) if is_element_symbol(label) => label,
            Some(label) => {
                aliases.push((i + 1, label));
                "*"
            }
        };
        writeln!(
            writer,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
            atom.x * scale,
            (0.0 - atom.y) * scale,
            0.0,
            symbol
        )?;
    }

    for bond in &molecule.bonds {
        writeln!(
            writer,
            "{:>3}{:>3}{:>3}{:>3}  0  0  0",
            bond.a + 1,
            bond.b + 1,
            bond_type(bond.order, bond.aromatic),
            bond_stereo(bond.style)
        )?;
    }

    let charged: Vec<(usize, i32)> = molecule
        .atoms
        .iter()
        .enumerate()
        .filter(|(_, a)| a.charge != 0)
        .map(|(i, a)| (i + 1, a.charge))
        .collect();
    for chunk in charged.chunks(8) {
        write!(writer, "M  CHG{:>3}", chunk.len())?;
        for (i, charge) in chunk {
            write!(writer, " {i:>3} {charge:>3}")?;
        }
        writeln!(writer)?;
    }
    for (i, label) in aliases {
        writeln!(writer, "A  {i:>3}")?;
        writeln!(writer, "{label}")?;
    }
    writeln!(writer, "M  END")?;
    Ok(())
}

/// Builds molfile blocks scored with the built-in confidence model.
#[derive(Debug, Clone, Copy, Default)]
pub struct MolfileBuilder;

impl MoleculeBuilder for MolfileBuilder {
    fn build(&self, molecule: &Molecule) -> Option<BuiltStructure> {
        if molecule.atoms.is_empty() {
            return None;
        }
        let mut block = Vec::new();
        write_molfile(&mut block, molecule, &formula(molecule)).ok()?;
        Some(BuiltStructure {
            text: String::from_utf8(block).ok()?,
            confidence: confidence(molecule),
            statistics: molecule.statistics,
        })
    }
}

/// Writes a structure's molfile block as one SDF record.
///
/// Every enabled annotation becomes a `> <Name>` data item.
pub fn write_sdf_record<W: Write>(
    mut writer: W,
    structure: &RecognizedStructure,
    annotations: &Annotations,
) -> Result<(), Error> {
    writeln!(writer, "{}", structure.structure.trim_end())?;
    for (name, value) in annotations.fields(structure) {
        writeln!(writer, "> <{name}>")?;
        writeln!(writer, "{value}")?;
        writeln!(writer)?;
    }
    writeln!(writer, "$$$$")?;
    Ok(())
}

/// Joins molfile blocks into RXN reactions.
///
/// The agent text goes on the comment line of the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct RxnFormatter;

impl ReactionFormatter for RxnFormatter {
    fn format(&self, reactants: &[&str], products: &[&str], agent: &str) -> String {
        let mut text = String::new();
        text.push_str("$RXN\n\n");
        text.push_str(&format!("  {PROGRAM}\n"));
        text.push_str(agent);
        text.push('\n');
        text.push_str(&format!("{:>3}{:>3}\n", reactants.len(), products.len()));
        for block in reactants.iter().chain(products) {
            text.push_str("$MOL\n");
            text.push_str(block.trim_end());
            text.push('\n');
        }
        text
    }

    /// The title line of the agent's block.
    fn agent_text(&self, structure: &str) -> String {
        structure.lines().next().unwrap_or_default().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::{BoundingBox, MoleculeAtom, MoleculeBond};

    fn make_atom(x: f64, y: f64, label: Option<&str>, charge: i32) -> MoleculeAtom {
        MoleculeAtom {
            x,
            y,
            label: label.map(str::to_string),
            charge,
            expansion: None,
        }
    }

    fn make_bond(a: usize, b: usize, order: u8, style: BondStyle) -> MoleculeBond {
        MoleculeBond {
            a,
            b,
            order,
            style,
            aromatic: false,
        }
    }

    fn make_molecule() -> Molecule {
        Molecule {
            atoms: vec![
                make_atom(0.0, 0.0, None, 0),
                make_atom(20.0, 0.0, Some("O"), -1),
                make_atom(0.0, 20.0, Some("OMe"), 0),
            ],
            bonds: vec![
                make_bond(0, 1, 1, BondStyle::Plain),
                make_bond(0, 2, 1, BondStyle::Wedge),
            ],
            avg_bond_length: 20.0,
            ..Default::default()
        }
    }

    fn render(molecule: &Molecule) -> String {
        let mut out = Vec::new();
        write_molfile(&mut out, molecule, "title").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn element_symbols_are_recognized() {
        assert!(is_element_symbol("C"));
        assert!(is_element_symbol("Cl"));
        assert!(!is_element_symbol("OMe"));
        assert!(!is_element_symbol("CH3"));
        assert!(!is_element_symbol("cl"));
    }

    #[test]
    fn formula_is_in_hill_order() {
        assert_eq!(formula(&make_molecule()), "COOMe");
    }

    #[test]
    fn molfile_block_layout() {
        let text = render(&make_molecule());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "title");
        assert!(lines[3].starts_with("  3  2"));
        assert!(lines[3].ends_with("V2000"));
        assert!(lines[5].starts_with("    1.5400    0.0000    0.0000 O"));
        assert!(lines[6].starts_with("    0.0000   -1.5400    0.0000 *"));
        assert_eq!(lines[7], "  1  2  1  0  0  0  0");
        assert_eq!(lines[8], "  1  3  1  1  0  0  0");
        assert_eq!(lines[9], "M  CHG  1   2  -1");
        assert_eq!(lines[10], "A    3");
        assert_eq!(lines[11], "OMe");
        assert_eq!(lines[12], "M  END");
    }

    #[test]
    fn builder_scores_with_the_confidence_model() {
        let molecule = make_molecule();
        let built = MolfileBuilder.build(&molecule).unwrap();
        assert!(built.text.starts_with("COOMe\n"));
        assert_eq!(built.confidence, confidence(&molecule));
        assert!(MolfileBuilder.build(&Molecule::default()).is_none());
    }

    #[test]
    fn sdf_record_carries_annotations() {
        let structure = RecognizedStructure {
            structure: "block\nM  END\n".to_string(),
            confidence: 0.5,
            resolution: 150,
            page: 1,
            bbox: BoundingBox::new(1, 2, 3, 4),
            bond_length: 12.0,
        };
        let annotations = Annotations {
            page: true,
            ..Default::default()
        };
        let mut out = Vec::new();
        write_sdf_record(&mut out, &structure, &annotations).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "block\nM  END\n> <Page>\n2\n\n$$$$\n");
    }

    #[test]
    fn rxn_counts_and_agent_title() {
        let formatter = RxnFormatter;
        assert_eq!(formatter.agent_text("CO\n  sketch-forge\n"), "CO");

        let text = formatter.format(&["A\nM  END\n", "B\nM  END"], &["P\nM  END"], "CO");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "$RXN");
        assert_eq!(lines[3], "CO");
        assert_eq!(lines[4], "  2  1");
        assert_eq!(text.matches("$MOL").count(), 3);
    }
}
