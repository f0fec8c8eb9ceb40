//! Graph statistics of a sketch or a finished molecule.
//!
//! Fragment, rotor and small-ring counts decide whether a topology edit is
//! kept (see [`resolve_bridge_bonds`](super::fragments::resolve_bridge_bonds))
//! and feed the fallback [`confidence`] score. Rings are perceived as the
//! smallest set of smallest rings over the cycle space of the bond graph.

use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::model::molecule::{Molecule, MoleculeStatistics};
use crate::model::sketch::Sketch;

#[derive(Debug, Clone, Copy)]
struct Link {
    order: u8,
    aromatic: bool,
}

/// Predecessor of each node on a breadth-first tree, with the edge used.
type Tree = Vec<Option<(NodeIndex, EdgeIndex)>>;

struct Topology {
    graph: UnGraph<(), Link>,
}

impl Topology {
    fn new(nodes: usize, links: impl IntoIterator<Item = (usize, usize, Link)>) -> Self {
        let mut graph = UnGraph::with_capacity(nodes, 0);
        for _ in 0..nodes {
            graph.add_node(());
        }
        for (a, b, link) in links {
            if a != b {
                graph.update_edge(NodeIndex::new(a), NodeIndex::new(b), link);
            }
        }
        Self { graph }
    }

    fn from_sketch(sketch: &Sketch) -> Self {
        let mut index = vec![None; sketch.atoms.len()];
        let mut nodes = 0usize;
        let mut links = Vec::new();
        for bond in sketch.bonds.iter() {
            if !bond.exists || !sketch.atoms[bond.a].exists || !sketch.atoms[bond.b].exists {
                continue;
            }
            let mut node = |atom: usize| {
                *index[atom].get_or_insert_with(|| {
                    nodes += 1;
                    nodes - 1
                })
            };
            let (a, b) = (node(bond.a), node(bond.b));
            links.push((
                a,
                b,
                Link {
                    order: bond.order,
                    aromatic: bond.arom,
                },
            ));
        }
        Self::new(nodes, links)
    }

    fn from_molecule(molecule: &Molecule) -> Self {
        Self::new(
            molecule.atoms.len(),
            molecule.bonds.iter().map(|b| {
                (
                    b.a,
                    b.b,
                    Link {
                        order: b.order,
                        aromatic: b.aromatic,
                    },
                )
            }),
        )
    }

    fn fragments(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Independent cycles: edges − nodes + components.
    fn cycle_rank(&self) -> usize {
        (self.graph.edge_count() + self.fragments()).saturating_sub(self.graph.node_count())
    }

    fn bfs_tree(&self, source: NodeIndex) -> (Vec<u32>, Tree) {
        let n = self.graph.node_count();
        let mut dist = vec![u32::MAX; n];
        let mut pred = vec![None; n];
        dist[source.index()] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(cur) = queue.pop_front() {
            for edge in self.graph.edges(cur) {
                let next = if edge.source() == cur { edge.target() } else { edge.source() };
                if dist[next.index()] == u32::MAX {
                    dist[next.index()] = dist[cur.index()] + 1;
                    pred[next.index()] = Some((cur, edge.id()));
                    queue.push_back(next);
                }
            }
        }
        (dist, pred)
    }

    /// Nodes (excluding the root) and edges on the tree path to `target`.
    fn tree_path(pred: &Tree, target: NodeIndex) -> (Vec<NodeIndex>, Vec<EdgeIndex>) {
        let (mut nodes, mut edges) = (Vec::new(), Vec::new());
        let mut cur = target;
        while let Some((prev, edge)) = pred[cur.index()] {
            nodes.push(cur);
            edges.push(edge);
            cur = prev;
        }
        (nodes, edges)
    }

    /// Horton candidate cycles: for every root and edge, the two shortest
    /// paths from the root to the edge's ends closed by the edge, when the
    /// paths share nothing but the root.
    fn candidate_cycles(&self) -> Vec<Vec<EdgeIndex>> {
        let mut candidates = Vec::new();
        for root in self.graph.node_indices() {
            let (dist, pred) = self.bfs_tree(root);
            for edge in self.graph.edge_references() {
                let (u, v) = (edge.source(), edge.target());
                if dist[u.index()] == u32::MAX || dist[v.index()] == u32::MAX {
                    continue;
                }
                if dist[u.index()] + dist[v.index()] + 1 < 3 {
                    continue;
                }
                let (nodes_u, mut edges_u) = Self::tree_path(&pred, u);
                let (nodes_v, edges_v) = Self::tree_path(&pred, v);
                if nodes_u.iter().any(|n| nodes_v.contains(n))
                    || edges_u.contains(&edge.id())
                    || edges_v.contains(&edge.id())
                {
                    continue;
                }
                edges_u.extend(edges_v);
                edges_u.push(edge.id());
                edges_u.sort();
                candidates.push(edges_u);
            }
        }
        candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        candidates.dedup();
        candidates
    }

    /// Smallest set of smallest rings, each given by its edges.
    fn rings(&self) -> Vec<Vec<EdgeIndex>> {
        let needed = self.cycle_rank();
        if needed == 0 {
            return Vec::new();
        }
        let words = self.graph.edge_count().div_ceil(64);
        let mut basis: Vec<(usize, Vec<u64>)> = Vec::with_capacity(needed);
        let mut rings = Vec::with_capacity(needed);
        for cycle in self.candidate_cycles() {
            if rings.len() >= needed {
                break;
            }
            let mut bits = vec![0u64; words];
            for e in &cycle {
                bits[e.index() / 64] ^= 1 << (e.index() % 64);
            }
            for (pivot, row) in &basis {
                if bits[pivot / 64] & (1 << (pivot % 64)) != 0 {
                    for (w, r) in bits.iter_mut().zip(row) {
                        *w ^= r;
                    }
                }
            }
            let Some(pivot) = leading_bit(&bits) else {
                continue;
            };
            basis.push((pivot, bits));
            rings.push(cycle);
        }
        rings
    }

    fn statistics(&self) -> MoleculeStatistics {
        let rings = self.rings();
        let mut in_ring = vec![false; self.graph.edge_count()];
        for e in rings.iter().flatten() {
            in_ring[e.index()] = true;
        }
        let in_triple: Vec<bool> = self
            .graph
            .node_indices()
            .map(|n| self.graph.edges(n).any(|e| e.weight().order == 3))
            .collect();
        let degree = |n: NodeIndex| self.graph.edges(n).count();

        let rotors = self
            .graph
            .edge_references()
            .filter(|e| {
                let link = e.weight();
                let (u, v) = (e.source(), e.target());
                link.order == 1
                    && !link.aromatic
                    && !in_ring[e.id().index()]
                    && degree(u) > 1
                    && degree(v) > 1
                    && !in_triple[u.index()]
                    && !in_triple[v.index()]
            })
            .count();

        MoleculeStatistics {
            fragments: self.fragments(),
            rotors,
            rings56: rings.iter().filter(|r| r.len() == 5 || r.len() == 6).count(),
            num_atoms: self.graph.node_count(),
            num_bonds: self.graph.edge_count(),
        }
    }
}

fn leading_bit(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

/// Statistics of the graph formed by the sketch's existing bonds.
///
/// Only atoms touched by an existing bond count; a rotor is a non-ring,
/// non-aromatic single bond between two atoms that each have another
/// neighbor and take part in no triple bond.
pub fn sketch_statistics(sketch: &Sketch) -> MoleculeStatistics {
    Topology::from_sketch(sketch).statistics()
}

pub fn molecule_statistics(molecule: &Molecule) -> MoleculeStatistics {
    Topology::from_molecule(molecule).statistics()
}

/// Heuristic plausibility score of a finished molecule.
///
/// Rewards heteroatoms common in drawings, small rings and aromatic rings,
/// and penalizes extra fragments. Offered to
/// [`MoleculeBuilder`](crate::MoleculeBuilder) implementations that cannot
/// score structures themselves.
pub fn confidence(molecule: &Molecule) -> f64 {
    let count = |symbol: &str| {
        molecule
            .atoms
            .iter()
            .filter(|a| a.label.as_deref().map_or("C", leading_element) == symbol)
            .count() as f64
    };
    let topology = Topology::from_molecule(molecule);
    let rings = topology.rings();
    let aromatic = rings
        .iter()
        .filter(|r| r.iter().all(|e| topology.graph[*e].aromatic))
        .count() as f64;
    let sized = |n: usize| rings.iter().filter(|r| r.len() == n).count() as f64;

    0.316030 - 0.016315 * count("C")
        + 0.034336 * count("N")
        + 0.066810 * count("O")
        + 0.035674 * count("F")
        + 0.065504 * count("S")
        + 0.198795 * count("Cl")
        - 0.212739 * topology.fragments() as f64
        + 0.049999 * rings.len() as f64
        + 0.181992 * aromatic
        + 0.071300 * sized(3)
        + 0.329922 * sized(4)
        + 0.342865 * sized(5)
        + 0.350747 * sized(6)
        + 0.296131 * sized(7)
}

/// The element symbol a label starts with: `"OH"` is O, `"CH3"` is C, `"Cl"` is Cl.
fn leading_element(label: &str) -> &str {
    let mut chars = label.char_indices();
    match (chars.next(), chars.next()) {
        (Some((_, c)), Some((i, l))) if c.is_ascii_uppercase() && l.is_ascii_lowercase() => {
            &label[..i + l.len_utf8()]
        }
        (Some((_, c)), _) if c.is_ascii_uppercase() => &label[..c.len_utf8()],
        _ => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::{BondStyle, MoleculeAtom, MoleculeBond};
    use crate::model::sketch::tests::make_sketch;

    fn ring_edges(n: usize, offset: usize) -> Vec<(usize, usize)> {
        (0..n).map(|k| (offset + k, offset + (k + 1) % n)).collect()
    }

    fn make_molecule(atoms: usize, bonds: &[(usize, usize, u8)]) -> Molecule {
        Molecule {
            atoms: (0..atoms)
                .map(|k| MoleculeAtom {
                    x: k as f64,
                    y: 0.0,
                    label: None,
                    charge: 0,
                    expansion: None,
                })
                .collect(),
            bonds: bonds
                .iter()
                .map(|&(a, b, order)| MoleculeBond {
                    a,
                    b,
                    order,
                    style: BondStyle::Plain,
                    aromatic: false,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn hexagon_has_one_six_ring_and_no_rotors() {
        let points: Vec<(f64, f64)> = (0..6).map(|k| (k as f64, 0.0)).collect();
        let stats = sketch_statistics(&make_sketch(&points, &ring_edges(6, 0)));
        assert_eq!(stats.fragments, 1);
        assert_eq!(stats.rings56, 1);
        assert_eq!(stats.rotors, 0);
        assert_eq!((stats.num_atoms, stats.num_bonds), (6, 6));
    }

    #[test]
    fn fused_rings_count_separately() {
        let mut bonds = ring_edges(6, 0);
        bonds.extend([(1, 6), (6, 7), (7, 8), (8, 9), (9, 2)]);
        let points: Vec<(f64, f64)> = (0..10).map(|k| (k as f64, 0.0)).collect();
        let stats = sketch_statistics(&make_sketch(&points, &bonds));
        assert_eq!(stats.rings56, 2);
        assert_eq!(stats.fragments, 1);
    }

    #[test]
    fn only_inner_chain_bonds_rotate() {
        let points: Vec<(f64, f64)> = (0..4).map(|k| (k as f64, 0.0)).collect();
        let stats = sketch_statistics(&make_sketch(&points, &[(0, 1), (1, 2), (2, 3)]));
        assert_eq!(stats.rotors, 1);
    }

    #[test]
    fn triple_bond_neighbors_do_not_rotate() {
        let molecule = make_molecule(5, &[(0, 1, 1), (1, 2, 1), (2, 3, 3), (3, 4, 1)]);
        assert_eq!(molecule_statistics(&molecule).rotors, 0);
    }

    #[test]
    fn retired_bonds_split_fragments() {
        let points: Vec<(f64, f64)> = (0..4).map(|k| (k as f64, 0.0)).collect();
        let mut sketch = make_sketch(&points, &[(0, 1), (1, 2), (2, 3)]);
        sketch.bonds[1].exists = false;
        let stats = sketch_statistics(&sketch);
        assert_eq!(stats.fragments, 2);
        assert_eq!(stats.num_bonds, 2);
    }

    #[test]
    fn rings_and_heteroatoms_raise_confidence() {
        let chain = make_molecule(6, &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1)]);
        let mut ring = make_molecule(6, &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1), (5, 0, 1)]);
        assert!(confidence(&ring) > confidence(&chain));

        let carbocycle = confidence(&ring);
        ring.atoms[0].label = Some("N".to_string());
        assert!(confidence(&ring) > carbocycle);
    }

    #[test]
    fn labels_count_as_their_leading_element() {
        assert_eq!(leading_element("OH"), "O");
        assert_eq!(leading_element("CH3"), "C");
        assert_eq!(leading_element("Cl"), "Cl");
        assert_eq!(leading_element("OMe"), "O");

        let mut hydroxy = make_molecule(2, &[(0, 1, 1)]);
        let mut oxygen = hydroxy.clone();
        hydroxy.atoms[1].label = Some("OH".to_string());
        oxygen.atoms[1].label = Some("O".to_string());
        assert!((confidence(&hydroxy) - confidence(&oxygen)).abs() < 1e-12);

        let mut methyl = make_molecule(2, &[(0, 1, 1)]);
        let carbon = confidence(&methyl);
        methyl.atoms[1].label = Some("CH3".to_string());
        assert!((confidence(&methyl) - carbon).abs() < 1e-12);
    }
}
