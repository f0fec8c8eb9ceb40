//! Page-level reaction assembly from arrows, plus signs and recognized
//! structures.
//!
//! Arrows are chained head to tail; every structure is assigned to the slot
//! before or after the arrow it lines up with (or becomes the arrow's agent
//! when drawn over it), and runs of structures joined by plus signs on
//! either side of an arrow become its reactants and products.

use std::collections::HashSet;

use super::collab::ReactionFormatter;
use crate::model::geometry::{BondFrame, Point};
use crate::model::molecule::{BoundingBox, RecognizedStructure};
use crate::model::reaction::Arrow;

/// Box center rounded toward zero, as pixel coordinates.
fn center(bbox: &BoundingBox) -> Point {
    Point::new(
        f64::from((bbox.x1 + bbox.x2) / 2),
        f64::from((bbox.y1 + bbox.y2) / 2),
    )
}

/// Orders arrows into a chain: starting at the page origin, the next arrow
/// is the one whose tail is nearest to the previous head.
pub fn linear_arrow_sort(arrows: &mut Vec<Arrow>) {
    let mut start = Point::default();
    let mut sorted = Vec::with_capacity(arrows.len());
    while !arrows.is_empty() {
        let mut closest = (f64::MAX, 0);
        for (i, arrow) in arrows.iter().enumerate() {
            let d = start.distance(arrow.tail);
            if d < closest.0 {
                closest = (d, i);
            }
        }
        let arrow = arrows.remove(closest.1);
        start = arrow.head;
        sorted.push(arrow);
    }
    *arrows = sorted;
}

/// Empties `slot` into a nearest-neighbour walk starting at `from`.
fn nearest_walk(mut from: Point, slot: &mut Vec<usize>, boxes: &[BoundingBox]) -> Vec<usize> {
    let mut walk = Vec::with_capacity(slot.len());
    while !slot.is_empty() {
        let mut nearest = (f64::MAX, 0);
        for (j, &k) in slot.iter().enumerate() {
            let d = from.distance(center(&boxes[k]));
            if d < nearest.0 {
                nearest = (d, j);
            }
        }
        let k = slot.remove(nearest.1);
        from = center(&boxes[k]);
        walk.push(k);
    }
    walk
}

/// Orders each slot by proximity: the slot before the first arrow ends at
/// its tail, every later slot starts at the preceding arrow's head.
fn sort_slots_from_arrows(arrows: &[Arrow], slots: &mut [Vec<usize>], boxes: &[BoundingBox]) {
    let Some(first) = arrows.first() else {
        return;
    };
    if slots.is_empty() || boxes.is_empty() {
        return;
    }
    let mut walk = nearest_walk(first.tail, &mut slots[0], boxes);
    walk.reverse();
    slots[0] = walk;
    for i in 1..slots.len() {
        slots[i] = nearest_walk(arrows[i - 1].head, &mut slots[i], boxes);
    }
}

/// Where one structure sits relative to the arrows.
enum Placement {
    /// Drawn over arrow `j`.
    Agent(usize),
    /// In the slot before arrow `j` (or after the last arrow when `j` equals
    /// the arrow count).
    Slot(usize),
    /// Not lined up with any arrow.
    Leftover,
}

fn place_structure(arrows: &[Arrow], bbox: &BoundingBox) -> Placement {
    let c = center(bbox);
    let (w, h) = (f64::from(bbox.width()), f64::from(bbox.height()));
    let mut tail = (f64::MAX, 0);
    let mut head = (f64::MAX, 0);
    for (j, arrow) in arrows.iter().enumerate() {
        let Some(frame) = BondFrame::new(arrow.tail, arrow.head) else {
            continue;
        };
        let along = frame.along(c);
        if along > 0.0 && along < frame.length() && c.distance(arrow.midpoint()) < w.max(h) {
            return Placement::Agent(j);
        }
        if frame.offset(c).abs() < w.min(h) {
            let r = arrow.tail.distance(c);
            if r < tail.0 {
                tail = (r, j);
            }
            let r = arrow.head.distance(c);
            if r < head.0 {
                head = (r, j);
            }
        }
    }
    if tail.0 == f64::MAX && head.0 == f64::MAX {
        Placement::Leftover
    } else if tail.0 < head.0 {
        Placement::Slot(tail.1)
    } else {
        Placement::Slot(head.1 + 1)
    }
}

/// Pairs of neighbouring structures in a slot joined by a plus sign, either
/// between their centers or at the end of a row that wraps.
fn plus_links(slots: &[Vec<usize>], boxes: &[BoundingBox], pluses: &[Point]) -> HashSet<(usize, usize)> {
    let mut links = HashSet::new();
    for slot in slots {
        for pair in slot.windows(2) {
            let (l, k) = (pair[0], pair[1]);
            let (a, b) = (&boxes[l], &boxes[k]);
            let (ca, cb) = (center(a), center(b));
            let frame = BondFrame::new(ca, cb);
            for plus in pluses {
                let between = frame.as_ref().is_some_and(|f| {
                    f.offset(*plus).abs() < f64::from(a.height().min(b.height()) / 2)
                        && plus.x > f64::from(a.x2)
                        && plus.x < f64::from(b.x1)
                });
                let wrapped = plus.x > f64::from(a.x2)
                    && (plus.y - ca.y).abs() < f64::from(a.height() / 2)
                    && b.y1 > a.y2;
                if between || wrapped {
                    links.insert((l.min(k), l.max(k)));
                }
            }
        }
    }
    links
}

/// Assembles reactions on one page.
///
/// Structures drawn over an arrow contribute their
/// [`agent_text`](ReactionFormatter::agent_text) to it. Structures not lined
/// up with any arrow fill an empty slot after the last arrow that lies
/// wholly above them. Each arrow with a non-empty run on both sides yields
/// one formatted reaction; empty formatter results are dropped.
pub fn arrange_reactions(
    mut arrows: Vec<Arrow>,
    structures: &[RecognizedStructure],
    pluses: &[Point],
    formatter: &dyn ReactionFormatter,
) -> Vec<String> {
    linear_arrow_sort(&mut arrows);
    let boxes: Vec<BoundingBox> = structures.iter().map(|s| s.bbox).collect();
    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); arrows.len() + 1];
    let mut leftover = Vec::new();

    for (i, bbox) in boxes.iter().enumerate() {
        match place_structure(&arrows, bbox) {
            Placement::Agent(j) => {
                let text = formatter.agent_text(&structures[i].structure);
                arrows[j].agent.push_str(&text);
            }
            Placement::Slot(j) => slots[j].push(i),
            Placement::Leftover => leftover.push(i),
        }
    }

    for &i in &leftover {
        let top = f64::from(boxes[i].y1);
        let j = arrows
            .iter()
            .take_while(|a| a.tail.y.max(a.head.y) < top)
            .count();
        if j < slots.len() && slots[j].is_empty() {
            slots[j].push(i);
        }
    }

    sort_slots_from_arrows(&arrows, &mut slots, &boxes);
    let links = plus_links(&slots, &boxes, pluses);
    let linked = |k: usize, l: usize| links.contains(&(k.min(l), k.max(l)));

    let mut reactions = Vec::new();
    for (i, arrow) in arrows.iter().enumerate() {
        let before = &slots[i];
        let after = &slots[i + 1];
        let (Some(&last), Some(&first)) = (before.last(), after.first()) else {
            continue;
        };

        let mut reactants = vec![last];
        for pair in before.windows(2).rev() {
            if !linked(pair[0], pair[1]) {
                break;
            }
            reactants.push(pair[0]);
        }
        let mut products = vec![first];
        for pair in after.windows(2) {
            if !linked(pair[0], pair[1]) {
                break;
            }
            products.push(pair[1]);
        }

        let text = |indices: &[usize]| -> Vec<&str> {
            indices.iter().map(|&k| structures[k].structure.as_str()).collect()
        };
        let reaction = formatter.format(&text(&reactants), &text(&products), arrow.agent.trim());
        let reaction = reaction.trim();
        if !reaction.is_empty() {
            reactions.push(reaction.to_string());
        }
    }
    tracing::debug!(arrows = arrows.len(), reactions = reactions.len(), "reactions assembled");
    reactions
}
