//! Detection of bond styles: wedges, hashes, cis/trans hints and aromatic
//! rings drawn as inscribed circles or nested outlines.

use super::config::Tolerances;
use super::error::Error;
use super::raster::{Raster, count_area};
use crate::model::geometry::{self, BondFrame, Point, Rect};
use crate::model::path::{PathId, PathSign, PathTree};
use crate::model::sketch::Sketch;

/// Hash marks considered per region.
const MAX_DASHES: usize = 100;

/// Line thickness reported when no plain bond could be measured.
const DEFAULT_THICKNESS: f64 = 1.5;

/// Stroke widths sampled along one bond.
struct Profile {
    /// `(position along the scan axis, width)` pairs.
    samples: Vec<(f64, f64)>,
    widest: i64,
    span: i64,
    /// `-1` when the bond runs against the scan axis.
    sign: f64,
}

impl Profile {
    fn slope(&self) -> f64 {
        let n = self.samples.len() as f64;
        let mx = self.samples.iter().map(|s| s.0).sum::<f64>() / n;
        let my = self.mean_width();
        let (num, den) = self.samples.iter().fold((0.0, 0.0), |(num, den), &(x, y)| {
            (num + (x - mx) * (y - my), den + (x - mx) * (x - mx))
        });
        if den != 0.0 { num / den } else { 0.0 }
    }

    fn mean_width(&self) -> f64 {
        self.samples.iter().map(|s| s.1).sum::<f64>() / self.samples.len() as f64
    }
}

/// Samples the stroke width across a bond from its midpoint toward both
/// ends, stopping at the first jump of more than two pixels.
///
/// With `across_x` the scan walks columns and measures vertical runs;
/// otherwise it walks rows and measures horizontal runs.
fn thickness_profile(
    raster: &Raster,
    a: Point,
    b: Point,
    across_x: bool,
    initial: i64,
    margin: i64,
    avg: f64,
    tolerances: &Tolerances,
) -> Profile {
    let (ua, va, ub, vb) = if across_x {
        (a.x, a.y, b.x, b.y)
    } else {
        (a.y, a.x, b.y, b.x)
    };
    let start = ((ua + ub) / 2.0) as i64;
    let max_c = ua.max(ub) as i64 - margin;
    let min_c = ua.min(ub) as i64 + margin;
    let measure = |u: i64| {
        let v = (va + (vb - va) * (u as f64 - ua) / (ub - ua)) as i64;
        let t = if across_x {
            raster.thickness_ver(u, v)
        } else {
            raster.thickness_hor(v, u)
        };
        i64::from(t)
    };

    let mut profile = Profile {
        samples: Vec::new(),
        widest: initial,
        span: max_c - min_c,
        sign: if ub < ua { -1.0 } else { 1.0 },
    };
    let mut scan = |us: &mut dyn Iterator<Item = i64>| {
        let mut old = initial;
        for u in us {
            let t = measure(u);
            if (t - old).abs() > 2 {
                break;
            }
            let tf = t as f64;
            if tf < 2.0 * tolerances.max_bond_thickness && tf < avg / 3.0 && t > 0 {
                profile.samples.push((u as f64, tf));
                profile.widest = profile.widest.max(t);
            }
            old = t;
        }
    };
    scan(&mut (start + 1..=max_c));
    scan(&mut (min_c..start).rev());
    profile
}

/// Flags bonds whose stroke widens steadily from one end to the other.
///
/// A single bond is a wedge when the least-squares slope of its width
/// profile, times the scanned span, exceeds `limit`. Wedges are oriented so
/// the narrow end is `a`, and atoms within the wide end's width are merged
/// into `b`.
///
/// # Returns
///
/// The median mean width of the bonds that are not wedges, which is the
/// line thickness used by the later repair passes.
pub fn find_wedge_bonds(
    sketch: &mut Sketch,
    raster: &Raster,
    max_dist_double: f64,
    avg: f64,
    limit: f64,
    margin: i64,
    tolerances: &Tolerances,
) -> f64 {
    let mut widths = vec![DEFAULT_THICKNESS];
    let mut plain = 0usize;
    for i in 0..sketch.bonds.len() {
        let bond = &sketch.bonds[i];
        if !bond.exists || bond.hash || bond.order != 1 || sketch.bond_length(i) <= max_dist_double {
            continue;
        }
        let (a, b) = sketch.bond_points(i);
        let mid = a.midpoint(b);
        let (x1, y1) = (mid.x as i64, mid.y as i64);
        let w_ver = i64::from(raster.thickness_ver(x1, y1));
        let w_hor = i64::from(raster.thickness_hor(x1, y1));
        if w_ver == 0 && w_hor == 0 {
            continue;
        }
        let across_x = (w_ver < w_hor && w_ver > 0) || w_hor == 0;
        let initial = if across_x { w_ver } else { w_hor };
        let profile = thickness_profile(raster, a, b, across_x, initial, margin, avg, tolerances);
        if profile.samples.is_empty() {
            continue;
        }

        let beta = profile.slope();
        if beta.abs() * profile.span as f64 > limit {
            sketch.bonds[i].wedge = true;
            if beta * profile.sign < 0.0 {
                sketch.bonds[i].swap_ends();
            }
            absorb_into_wide_end(sketch, i, profile.widest as f64);
        } else {
            widths.push(profile.mean_width().trunc());
            plain += 1;
        }
    }
    widths.sort_by(f64::total_cmp);
    let thickness = if plain > 0 {
        widths[(plain - 1) / 2]
    } else {
        DEFAULT_THICKNESS
    };
    tracing::debug!(
        wedges = sketch.bonds.iter().filter(|b| b.exists && b.wedge).count(),
        thickness,
        "wedge bonds detected"
    );
    thickness
}

fn absorb_into_wide_end(sketch: &mut Sketch, bond: usize, width: f64) {
    let wide = sketch.bonds[bond].b;
    for j in 0..sketch.atoms.len() {
        if !sketch.atoms[j].exists || j == wide || sketch.point(wide).distance(sketch.point(j)) > width {
            continue;
        }
        sketch.atoms[j].exists = false;
        let merged = sketch.point(wide).midpoint(sketch.point(j));
        sketch.atoms[wide].set_point(merged);
        sketch.retarget(j, wide);
    }
}

/// One candidate hash mark.
#[derive(Debug, Clone, Copy)]
struct Dash {
    at: Point,
    path: PathId,
    weight: f64,
    free: bool,
}

/// Collects small positive outlines as hash-mark candidates.
fn collect_dashes(tree: &PathTree, raster: &Raster, max_area: f64, avg: f64, thick: bool) -> Vec<Dash> {
    let mut mask = thick.then(|| raster.dark_mask());
    let mut dashes = Vec::new();
    for path in tree.iter() {
        if !path.is_positive() || path.area >= max_area {
            continue;
        }
        let (Some(mut at), Some(bounds)) = (path.centroid(), path.bounding_box()) else {
            continue;
        };
        let weight = match mask.as_mut() {
            Some(mask) => count_area(mask, &mut at) as f64,
            None => path.area,
        };
        if 2.0 * bounds.half_diagonal() < avg / 3.0 && dashes.len() < MAX_DASHES {
            dashes.push(Dash {
                at,
                path: path.id,
                weight,
                free: true,
            });
        }
    }
    dashes
}

/// Groups dashes starting at `seed`: the nearest free dash within `dist`,
/// then repeatedly the free dash nearest the running midpoint that stays on
/// the line through the first and latest marks.
fn chain_dashes(dashes: &mut [Dash], seed: usize, dist: f64, v_disp: f64) -> (Vec<usize>, Rect) {
    let mut chain = vec![seed];
    dashes[seed].free = false;
    let mut bounds = Rect::at(dashes[seed].at);
    let origin = dashes[seed].at;

    let second = (seed + 1..dashes.len())
        .filter(|&j| dashes[j].free && origin.distance(dashes[j].at) <= dist)
        .min_by(|&p, &q| {
            origin
                .distance(dashes[p].at)
                .total_cmp(&origin.distance(dashes[q].at))
        });
    let Some(second) = second else {
        return (chain, bounds);
    };
    dashes[second].free = false;
    bounds.include(dashes[second].at);
    let mut m = origin.midpoint(dashes[second].at);
    chain.push(second);

    loop {
        let last = dashes[chain[chain.len() - 1]].at;
        let line = BondFrame::new(origin, last);
        let next = (second + 1..dashes.len())
            .filter(|&j| {
                dashes[j].free
                    && m.distance(dashes[j].at) <= dist
                    && line.is_some_and(|f| f.offset(dashes[j].at).abs() < v_disp)
            })
            .min_by(|&p, &q| m.distance(dashes[p].at).total_cmp(&m.distance(dashes[q].at)));
        let Some(next) = next else {
            break;
        };
        dashes[next].free = false;
        bounds.include(dashes[next].at);
        m = m.midpoint(dashes[next].at);
        chain.push(next);
    }
    (chain, bounds)
}

/// Every mark sits within `v_disp` of the line through the end marks.
fn collinear(marks: &[Dash], v_disp: f64) -> bool {
    let (first, last) = (marks[0].at, marks[marks.len() - 1].at);
    let (dx, dy) = (last.x - first.x, last.y - first.y);
    let along_x = dx.abs() > dy.abs();
    let k = if along_x { dy / dx } else { dx / dy };
    marks[1..marks.len() - 1].iter().all(|d| {
        let (nx, ny) = (d.at.x - first.x, d.at.y - first.y);
        let diff = if along_x { k * nx - ny } else { k * ny - nx };
        !(diff.abs() > v_disp)
    })
}

/// Moves both ends of bond `a → b` outward by one mark spacing.
fn extend_dashed_bond(sketch: &mut Sketch, a: usize, b: usize, marks: usize) {
    let (p, q) = (sketch.point(a), sketch.point(b));
    let l = p.distance(q);
    if l <= f64::EPSILON || marks < 2 {
        return;
    }
    let (kx, ky) = ((q.x - p.x) / l, (q.y - p.y) / l);
    let gap = l / (marks - 1) as f64;
    sketch.atoms[a].set_point(Point::new(p.x - kx * gap, p.y - ky * gap));
    sketch.atoms[b].set_point(Point::new(q.x + kx * gap, q.y + ky * gap));
}

/// Replaces rows of three or more collinear small marks by one hash bond.
///
/// Marks are outlines smaller than `max_area` whose extent is under a
/// third of a bond. The resulting bond spans the outermost marks extended
/// by one spacing at each end, and points from the lighter mark to the
/// heavier one: the wide end of a hashed wedge is `b`. With `thick` a
/// mark's weight is its flood-filled ink area, otherwise its outline area.
pub fn find_dashed_bonds(
    tree: &PathTree,
    sketch: &mut Sketch,
    raster: &Raster,
    max_area: f64,
    avg: f64,
    dist: f64,
    thick: bool,
    tolerances: &Tolerances,
) -> Result<(), Error> {
    let mut dashes = collect_dashes(tree, raster, max_area, avg, thick);
    let v_disp = tolerances.v_displacement;
    let mut found = 0usize;
    for i in 0..dashes.len() {
        if !dashes[i].free {
            continue;
        }
        let (chain, bounds) = chain_dashes(&mut dashes, i, dist, v_disp);
        if chain.len() <= 2 {
            continue;
        }
        let mut marks: Vec<Dash> = chain.iter().map(|&k| dashes[k]).collect();
        if bounds.width() > bounds.height() {
            marks.sort_by(|p, q| p.at.x.total_cmp(&q.at.x));
        } else {
            marks.sort_by(|p, q| p.at.y.total_cmp(&q.at.y));
        }
        if !collinear(&marks, v_disp) {
            continue;
        }

        for mark in &marks {
            sketch.delete_curve(mark.path);
        }
        let (first, last) = (marks[0], marks[marks.len() - 1]);
        let a = sketch.add_atom(first.at.x, first.at.y, first.path)?;
        let b = sketch.add_atom(last.at.x, last.at.y, last.path)?;
        let bond = sketch.add_bond(a, b, first.path)?;
        if first.weight > last.weight {
            sketch.bonds[bond].swap_ends();
        }
        sketch.bonds[bond].hash = true;
        let (a, b) = (sketch.bonds[bond].a, sketch.bonds[bond].b);
        extend_dashed_bond(sketch, a, b, marks.len());
        found += 1;
    }
    tracing::debug!(hashes = found, "dashed bonds assembled");
    Ok(())
}

/// Marks single bonds hanging off double bonds as `up` or `down` by the
/// side of the double bond they leave from.
///
/// Double bonds are first oriented left to right (top to bottom when
/// vertical); the attached single bond is re-oriented to point away from
/// the double bond's `a` end or toward its `b` end.
pub fn find_up_down_bonds(sketch: &mut Sketch, thickness: f64) {
    for bond in sketch.bonds.iter_mut().filter(|b| b.exists && b.is_plain_single()) {
        bond.up = false;
        bond.down = false;
    }
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists || sketch.bonds[i].order != 2 {
            continue;
        }
        let (a, b) = sketch.bond_points(i);
        if a.x > b.x || (a.x == b.x && a.y > b.y) {
            sketch.bonds[i].swap_ends();
        }
        let Some(frame) = sketch.bond_frame(i) else {
            continue;
        };
        let (ia, ib) = (sketch.bonds[i].a, sketch.bonds[i].b);
        for j in 0..sketch.bonds.len() {
            if j == i || !sketch.bonds[j].exists || !sketch.bonds[j].is_plain_single() {
                continue;
            }
            let at_a = if sketch.bonds[j].b == ia {
                Some(true)
            } else if sketch.bonds[j].a == ia {
                sketch.bonds[j].swap_ends();
                Some(true)
            } else if sketch.bonds[j].a == ib {
                Some(false)
            } else if sketch.bonds[j].b == ib {
                sketch.bonds[j].swap_ends();
                Some(false)
            } else {
                None
            };
            let Some(at_a) = at_a else {
                continue;
            };
            let far = if at_a { sketch.bonds[j].a } else { sketch.bonds[j].b };
            let mut h = frame.offset(sketch.point(far));
            if !at_a {
                h = -h;
            }
            let bond = &mut sketch.bonds[j];
            if h > thickness {
                bond.down = true;
                bond.up = false;
            } else if h < -thickness {
                bond.up = true;
                bond.down = false;
            }
        }
    }
}

/// Marks aromatic rings drawn in the older styles.
///
/// A hole whose ring is still traced as bonds, containing an ink outline
/// that itself has a hole, is a ring drawn with a parallel inner ring: the
/// outer ring's bonds become aromatic and the inner ring is dropped. A
/// round ink outline with a hole, small enough to sit inside a ring, is an
/// inscribed circle: it is dropped and the bonds around it become aromatic.
pub fn find_old_aromatic_bonds(tree: &PathTree, sketch: &mut Sketch, avg: f64, tolerances: &Tolerances) {
    for bond in sketch.bonds.iter_mut().filter(|b| b.exists) {
        bond.arom = false;
    }
    let sign_of = |id: PathId| tree.get(id).map(|p| p.sign);

    for path in tree.iter() {
        if path.sign != PathSign::Negative || !sketch.path_has_plain_bond(path.id) {
            continue;
        }
        let Some(&child) = tree.children(path.id).first() else {
            continue;
        };
        if sign_of(child) != Some(PathSign::Positive) {
            continue;
        }
        let Some(&grandchild) = tree.children(child).first() else {
            continue;
        };
        if sign_of(grandchild) != Some(PathSign::Negative) {
            continue;
        }
        for bond in sketch.bonds.iter_mut().filter(|b| b.exists && b.path == path.id) {
            bond.arom = true;
        }
        sketch.delete_curve_with_children(tree, child);
    }

    for path in tree.iter() {
        if !path.is_positive() || !sketch.path_has_plain_bond(path.id) {
            continue;
        }
        let Some(&child) = tree.children(path.id).first() else {
            continue;
        };
        if sign_of(child) != Some(PathSign::Negative) {
            continue;
        }
        let circumference: f64 = sketch
            .existing_bonds()
            .filter(|&i| sketch.bonds[i].path == path.id)
            .map(|i| sketch.bond_length(i))
            .sum();
        let vertices: Vec<Point> = sketch
            .atoms
            .iter()
            .filter(|a| a.exists && a.path == path.id)
            .map(|a| a.point())
            .collect();
        if vertices.len() <= 4 {
            continue;
        }
        let mut diameter = 0.0f64;
        for (k, p) in vertices.iter().enumerate() {
            for q in &vertices[k + 1..] {
                diameter = diameter.max(p.distance(*q));
            }
        }
        let n = vertices.len() as f64;
        let center = Point::new(
            vertices.iter().map(|p| p.x).sum::<f64>() / n,
            vertices.iter().map(|p| p.y).sum::<f64>() / n,
        );
        let centered = vertices
            .iter()
            .all(|p| (p.distance(center) - diameter / 2.0).abs() <= tolerances.v_displacement);
        if !(circumference < std::f64::consts::PI * diameter
            && diameter > avg / 2.0
            && diameter < 3.0 * avg
            && centered)
        {
            continue;
        }

        sketch.delete_curve_with_children(tree, path.id);
        for i in 0..sketch.bonds.len() {
            if !sketch.bonds[i].exists {
                continue;
            }
            let (a, b) = sketch.bond_points(i);
            let facing = geometry::cosine(b, a, center, a).clamp(-1.0, 1.0).acos().to_degrees();
            if facing < 90.0 && a.midpoint(b).distance(center) < avg / 3.0 + diameter / 2.0 {
                sketch.bonds[i].arom = true;
            }
        }
    }
}

/// Merges short single bonds hanging off the ends of conjoined double bonds
/// into the double bond's end atom.
pub fn collapse_double_bonds(sketch: &mut Sketch, dist: f64) {
    for i in 0..sketch.bonds.len() {
        let bi = &sketch.bonds[i];
        if !bi.exists || bi.order != 2 || !bi.conjoined {
            continue;
        }
        for j in 0..sketch.bonds.len() {
            if j == i || !sketch.bonds[j].exists || sketch.bonds[j].order != 1 || sketch.bond_length(j) > dist {
                continue;
            }
            let (ia, ib) = (sketch.bonds[i].a, sketch.bonds[i].b);
            let (ja, jb) = (sketch.bonds[j].a, sketch.bonds[j].b);
            let (end, stray) = if ja == ia {
                (ia, jb)
            } else if jb == ia {
                (ia, ja)
            } else if ja == ib {
                (ib, jb)
            } else if jb == ib {
                (ib, ja)
            } else {
                continue;
            };
            sketch.bonds[j].exists = false;
            let merged = sketch.point(end).midpoint(sketch.point(stray));
            sketch.atoms[end].set_point(merged);
            sketch.retarget(stray, end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::raster::tests::{fill_rect, make_canvas};
    use crate::model::path::{Segment, VectorPath};
    use crate::model::sketch::tests::make_sketch;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_path(id: u32, sign: PathSign, area: f64, l: f64, t: f64, r: f64, b: f64, children: Vec<PathId>) -> VectorPath {
        let (mx, my) = ((l + r) / 2.0, (t + b) / 2.0);
        VectorPath {
            id: PathId(id),
            sign,
            area,
            segments: vec![
                Segment::corner(Point::new(r, t), Point::new(r, my)),
                Segment::corner(Point::new(r, b), Point::new(mx, b)),
                Segment::corner(Point::new(l, b), Point::new(l, my)),
                Segment::corner(Point::new(l, t), Point::new(mx, t)),
            ],
            children,
        }
    }

    /// A stroke from x = 10 to x = 30 whose width grows linearly from 1 to 6 px.
    fn make_widening_stroke() -> Raster {
        let mut img = make_canvas(50, 40);
        for x in 10..=30u32 {
            let width = 1 + (5.0 * f64::from(x - 10) / 20.0).round() as u32;
            let top = 20 - (width - 1) / 2;
            fill_rect(&mut img, x, top, x, top + width - 1);
        }
        Raster::new(img, 0.4)
    }

    #[test]
    fn widening_stroke_is_a_wedge_with_narrow_end_first() {
        let raster = make_widening_stroke();
        for points in [[(30.0, 20.0), (10.0, 20.0)], [(10.0, 20.0), (30.0, 20.0)]] {
            let mut sketch = make_sketch(&points, &[(0, 1)]);

            find_wedge_bonds(&mut sketch, &raster, 5.0, 30.0, 3.0, 1, &Tolerances::default());

            let bond = &sketch.bonds[0];
            assert!(bond.wedge);
            assert!(approx_eq(sketch.point(bond.a).x, 10.0));
            assert!(approx_eq(sketch.point(bond.b).x, 30.0));
        }
    }

    #[test]
    fn uniform_stroke_is_not_a_wedge() {
        let mut img = make_canvas(50, 40);
        fill_rect(&mut img, 10, 19, 30, 21);
        let raster = Raster::new(img, 0.4);
        let mut sketch = make_sketch(&[(10.0, 20.0), (30.0, 20.0)], &[(0, 1)]);

        let thickness = find_wedge_bonds(&mut sketch, &raster, 5.0, 30.0, 3.0, 1, &Tolerances::default());

        assert!(!sketch.bonds[0].wedge);
        assert!(approx_eq(thickness, 1.5));
        assert_eq!(sketch.bonds[0].a, 0);
    }

    #[test]
    fn collinear_dashes_become_extended_hash_bond() {
        let raster = Raster::new(make_canvas(60, 40), 0.4);
        let tree = PathTree::new(
            [10.0, 16.0, 22.0, 28.0]
                .iter()
                .enumerate()
                .map(|(k, &x)| make_path(k as u32 + 1, PathSign::Positive, 8.0, x - 1.0, 18.0, x + 1.0, 22.0, vec![]))
                .collect(),
        );
        let mut sketch = Sketch::new(100);

        find_dashed_bonds(&tree, &mut sketch, &raster, 40.0, 30.0, 30.0, false, &Tolerances::default()).unwrap();

        assert_eq!(sketch.count_bonds().0, 1);
        let bond = &sketch.bonds[0];
        assert!(bond.hash);
        let (a, b) = sketch.bond_points(0);
        assert!(approx_eq(a.x, 4.0) && approx_eq(a.y, 20.0));
        assert!(approx_eq(b.x, 34.0) && approx_eq(b.y, 20.0));
    }

    #[test]
    fn heavier_first_dash_flips_hash_direction() {
        let raster = Raster::new(make_canvas(60, 40), 0.4);
        let tree = PathTree::new(
            [10.0, 16.0, 22.0]
                .iter()
                .enumerate()
                .map(|(k, &x)| {
                    let area = if k == 0 { 9.0 } else { 4.0 };
                    make_path(k as u32 + 1, PathSign::Positive, area, x - 1.0, 18.0, x + 1.0, 22.0, vec![])
                })
                .collect(),
        );
        let mut sketch = Sketch::new(100);

        find_dashed_bonds(&tree, &mut sketch, &raster, 40.0, 30.0, 30.0, false, &Tolerances::default()).unwrap();

        let (a, b) = sketch.bond_points(0);
        assert!(a.x > b.x);
    }

    #[test]
    fn two_dashes_are_not_a_hash() {
        let raster = Raster::new(make_canvas(60, 40), 0.4);
        let tree = PathTree::new(vec![
            make_path(1, PathSign::Positive, 8.0, 9.0, 18.0, 11.0, 22.0, vec![]),
            make_path(2, PathSign::Positive, 8.0, 15.0, 18.0, 17.0, 22.0, vec![]),
        ]);
        let mut sketch = Sketch::new(100);
        find_dashed_bonds(&tree, &mut sketch, &raster, 40.0, 30.0, 30.0, false, &Tolerances::default()).unwrap();
        assert_eq!(sketch.count_bonds().0, 0);
    }

    #[test]
    fn singles_on_double_bond_get_sides() {
        let mut sketch = make_sketch(
            &[(30.0, 0.0), (0.0, 0.0), (-10.0, 10.0), (40.0, 10.0)],
            &[(0, 1), (2, 1), (0, 3)],
        );
        sketch.bonds[0].order = 2;
        find_up_down_bonds(&mut sketch, 2.0);

        // oriented left to right
        assert_eq!((sketch.bonds[0].a, sketch.bonds[0].b), (1, 0));
        assert!(sketch.bonds[1].up && !sketch.bonds[1].down);
        assert!(sketch.bonds[2].down && !sketch.bonds[2].up);
        assert_eq!(sketch.bonds[2].a, 0);
    }

    fn ring_sketch(center: Point, radius: f64, n: usize, path: PathId) -> Sketch {
        let points: Vec<(f64, f64)> = (0..n)
            .map(|k| {
                let t = k as f64 * std::f64::consts::TAU / n as f64;
                (center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect();
        let bonds: Vec<(usize, usize)> = (0..n).map(|k| (k, (k + 1) % n)).collect();
        let mut sketch = make_sketch(&points, &bonds);
        for atom in sketch.atoms.iter_mut() {
            atom.path = path;
        }
        for bond in sketch.bonds.iter_mut() {
            bond.path = path;
        }
        sketch
    }

    #[test]
    fn inscribed_circle_marks_surrounding_bonds_aromatic() {
        let center = Point::new(50.0, 50.0);
        let mut sketch = ring_sketch(center, 10.0, 8, PathId(1));
        let a = sketch.add_atom(35.0, 40.0, PathId(3)).unwrap();
        let b = sketch.add_atom(65.0, 40.0, PathId(3)).unwrap();
        let near = sketch.add_bond(a, b, PathId(3)).unwrap();
        let c = sketch.add_atom(200.0, 200.0, PathId(4)).unwrap();
        let d = sketch.add_atom(230.0, 200.0, PathId(4)).unwrap();
        let far = sketch.add_bond(c, d, PathId(4)).unwrap();
        let tree = PathTree::new(vec![
            make_path(1, PathSign::Positive, 60.0, 40.0, 40.0, 60.0, 60.0, vec![PathId(2)]),
            make_path(2, PathSign::Negative, 40.0, 42.0, 42.0, 58.0, 58.0, vec![]),
        ]);

        find_old_aromatic_bonds(&tree, &mut sketch, 30.0, &Tolerances::default());

        assert!(sketch.bonds[near].arom);
        assert!(!sketch.bonds[far].arom);
        assert!(!sketch.bonds[0].exists);
    }

    #[test]
    fn nested_ring_outline_is_aromatic() {
        let mut sketch = ring_sketch(Point::new(50.0, 50.0), 20.0, 6, PathId(1));
        let inner = ring_sketch(Point::new(50.0, 50.0), 14.0, 6, PathId(2));
        let offset = sketch.atoms.len();
        for atom in inner.atoms.iter() {
            sketch.atoms.push(atom.clone()).unwrap();
        }
        for bond in inner.bonds.iter() {
            let mut bond = bond.clone();
            bond.a += offset;
            bond.b += offset;
            sketch.bonds.push(bond).unwrap();
        }
        let tree = PathTree::new(vec![
            make_path(1, PathSign::Negative, 900.0, 30.0, 30.0, 70.0, 70.0, vec![PathId(2)]),
            make_path(2, PathSign::Positive, 500.0, 36.0, 36.0, 64.0, 64.0, vec![PathId(3)]),
            make_path(3, PathSign::Negative, 400.0, 38.0, 38.0, 62.0, 62.0, vec![]),
        ]);

        find_old_aromatic_bonds(&tree, &mut sketch, 30.0, &Tolerances::default());

        assert!((0..6).all(|i| sketch.bonds[i].exists && sketch.bonds[i].arom));
        assert!((6..12).all(|i| !sketch.bonds[i].exists));
    }

    #[test]
    fn stub_on_conjoined_double_bond_is_absorbed() {
        let mut sketch = make_sketch(
            &[(0.0, 0.0), (30.0, 0.0), (32.0, 1.0), (50.0, 10.0)],
            &[(0, 1), (1, 2), (2, 3)],
        );
        sketch.bonds[0].order = 2;
        sketch.bonds[0].conjoined = true;
        collapse_double_bonds(&mut sketch, 3.0);

        assert!(!sketch.bonds[1].exists);
        assert_eq!(sketch.bonds[2].a, 1);
        assert!(approx_eq(sketch.atoms[1].x, 31.0) && approx_eq(sketch.atoms[1].y, 0.5));
    }
}
