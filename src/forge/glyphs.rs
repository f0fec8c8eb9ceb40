//! Extraction of character glyphs from the traced outlines.
//!
//! Outlines small enough to be characters are handed to the recognizer;
//! recognized ones become [`Letter`](crate::model::letter::Letter)s and the
//! strokes they were traced into are removed from the sketch. Later passes
//! recover charge signs, characters fused into the bond skeleton, the
//! vertical stroke of a chlorine `l`, and clusters too small to be bonds.

use std::collections::VecDeque;

use super::collab::{Preprocess, RecognizerSession};
use super::config::Tolerances;
use super::error::Error;
use super::raster::Raster;
use crate::model::geometry::{self, Rect};
use crate::model::path::{PathTree, SegmentTag, VectorPath};
use crate::model::sketch::Sketch;

/// Characters the recognizer tends to hallucinate on fused bond strokes.
const FUSED_REJECTS: [char; 9] = ['P', 'p', 'F', 'X', 'Y', 'n', 'U', 'u', 'h'];

/// Glyph dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSize {
    pub width: u32,
    pub height: u32,
}

impl FontSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn w(&self) -> i64 {
        i64::from(self.width)
    }

    fn h(&self) -> i64 {
        i64::from(self.height)
    }
}

/// Integer extremes of an outline's control points, with the coordinate
/// each extreme was reached at (`x1` at the top, `y1` at the left, `x2` at
/// the bottom, `y2` at the right).
#[derive(Debug, Clone, Copy)]
struct GlyphBox {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
}

impl GlyphBox {
    fn of(path: &VectorPath, width: i64, height: i64) -> Self {
        let mut gb = Self {
            left: width,
            top: height,
            right: 0,
            bottom: 0,
            x1: 0,
            y1: 0,
            x2: 0,
            y2: 0,
        };
        for seg in &path.segments {
            let controls: &[_] = match seg.tag {
                SegmentTag::Corner => &seg.c[1..],
                SegmentTag::Curve => &seg.c[..],
            };
            for p in controls {
                let (x, y) = (p.x as i64, p.y as i64);
                if p.x < gb.left as f64 {
                    gb.left = x;
                    gb.y1 = y;
                }
                if p.x > gb.right as f64 {
                    gb.right = x;
                    gb.y2 = y;
                }
                if p.y < gb.top as f64 {
                    gb.top = y;
                    gb.x1 = x;
                }
                if p.y > gb.bottom as f64 {
                    gb.bottom = y;
                    gb.x2 = x;
                }
            }
        }
        gb
    }

    fn width(&self) -> i64 {
        self.right - self.left
    }

    fn height(&self) -> i64 {
        self.bottom - self.top
    }

    fn rect(&self) -> Rect {
        int_rect(self.left, self.top, self.right, self.bottom)
    }
}

fn int_rect(left: i64, top: i64, right: i64, bottom: i64) -> Rect {
    Rect::new(left as f64, top as f64, right as f64, bottom as f64)
}

/// Runs the recognizer on `rect`, retrying with progressively stronger
/// de-noising.
pub fn recognize_glyph(
    session: &mut dyn RecognizerSession,
    raster: &Raster,
    rect: Rect,
) -> Option<char> {
    Preprocess::ATTEMPTS
        .iter()
        .find_map(|&preprocess| session.recognize(raster.image(), rect, preprocess))
}

/// Recognizes characters among the positive outlines.
///
/// Each candidate box is tried whole, then split top/bottom (two stacked
/// glyphs) and finally left/right (two glyphs side by side); a split only
/// counts when both halves are recognized.
///
/// # Returns
///
/// The size of the largest glyph recognized plus one pixel, or `max_font`
/// along each dimension where nothing was recognized.
pub fn find_chars(
    tree: &PathTree,
    raster: &Raster,
    sketch: &mut Sketch,
    session: &mut dyn RecognizerSession,
    max_font: FontSize,
    tolerances: &Tolerances,
) -> Result<FontSize, Error> {
    let (width, height) = (i64::from(raster.width()), i64::from(raster.height()));
    let v_disp = tolerances.v_displacement;
    let min_h = i64::from(tolerances.min_font_height);
    let sized = |w: i64, h: i64| w as f64 > v_disp && h > min_h;
    let (mut real_w, mut real_h) = (0i64, 0i64);

    for path in tree.iter().filter(|p| p.is_positive()) {
        let mut gb = GlyphBox::of(path, width, height);

        if gb.height() <= 2 * max_font.h() && gb.width() <= 2 * max_font.w() && sized(gb.width(), gb.height()) {
            while gb.top > 0 && raster.is_dark(gb.x1, gb.top) {
                gb.top -= 1;
            }
            while gb.bottom < height && raster.is_dark(gb.x2, gb.bottom) {
                gb.bottom += 1;
            }
            while gb.left > 0 && raster.is_dark(gb.left, gb.y1) {
                gb.left -= 1;
            }
            while gb.right < width && raster.is_dark(gb.right, gb.y2) {
                gb.right += 1;
            }
        }
        let (l, t, r, b) = (gb.left, gb.top, gb.right, gb.bottom);
        if !sized(gb.width(), gb.height()) {
            continue;
        }

        let mut found = false;
        if gb.height() <= max_font.h() && gb.width() <= max_font.w() {
            if let Some(ch) = recognize_glyph(session, raster, gb.rect()) {
                place(sketch, ch, l, t, r, b)?;
                real_w = real_w.max(r - l);
                real_h = real_h.max(b - t);
                found = true;
            }
        }
        if !found && gb.height() <= 2 * max_font.h() && gb.width() <= max_font.w() {
            let mid = (t + b) / 2;
            let lower = recognize_glyph(session, raster, int_rect(l, mid, r, b));
            let upper = recognize_glyph(session, raster, int_rect(l, t, r, mid));
            if let (Some(lower), Some(upper)) = (lower, upper) {
                place(sketch, lower, l, mid, r, b)?;
                place(sketch, upper, l, t, r, mid)?;
                real_w = real_w.max(r - l);
                real_h = real_h.max(b - mid).max(mid - t);
                found = true;
            }
        }
        if !found && gb.height() <= max_font.h() && gb.width() <= 2 * max_font.w() {
            let mid = (l + r) / 2;
            let left = recognize_glyph(session, raster, int_rect(l, t, mid, b));
            let right = recognize_glyph(session, raster, int_rect(mid, t, r, b));
            if let (Some(left), Some(right)) = (left, right) {
                place(sketch, left, l, t, mid, b)?;
                place(sketch, right, mid, t, r, b)?;
                real_w = real_w.max(mid - l).max(r - mid);
                real_h = real_h.max(b - t);
                found = true;
            }
        }
        if found {
            sketch.delete_bonds_in_rect(gb.rect());
            sketch.delete_curve_with_children(tree, path.id);
        }
    }

    let grow = |real: i64, max: u32| if real < 1 { max } else { real as u32 + 1 };
    let font = FontSize::new(grow(real_w, max_font.width), grow(real_h, max_font.height));
    tracing::debug!(
        letters = sketch.letters.len(),
        font_width = font.width,
        font_height = font.height,
        "characters recognized"
    );
    Ok(font)
}

/// Adds a letter centered on the integer box.
fn place(sketch: &mut Sketch, ch: char, l: i64, t: i64, r: i64, b: i64) -> Result<usize, Error> {
    let rect = int_rect(l, t, r, b);
    Ok(sketch.add_letter(
        ch,
        ((l + r) / 2) as f64,
        ((t + b) / 2) as f64,
        rect.half_diagonal(),
    )?)
}

/// Turns flat filled dashes into `-` and compact symmetric crosses into `+`.
pub fn find_plus_minus(
    tree: &PathTree,
    sketch: &mut Sketch,
    font: FontSize,
    width: u32,
    height: u32,
) -> Result<(), Error> {
    let (width, height) = (i64::from(width), i64::from(height));
    for path in tree.iter() {
        if !path.is_positive() || !sketch.path_has_plain_bond(path.id) {
            continue;
        }
        let gb = GlyphBox::of(path, width, height);
        let (w, h) = (gb.width(), gb.height());
        if h > font.h() || w > font.w() || w <= 1 {
            continue;
        }
        let aspect = h as f64 / w as f64;
        let fill = if h * w != 0 {
            path.area / (h * w) as f64
        } else if h == 0 {
            1.0
        } else {
            0.0
        };
        let cy = ((gb.top + gb.bottom) / 2) as f64;
        let right = gb.right as f64;
        let rect = gb.rect();
        let char_to_right = sketch.letters.iter().any(|l| {
            l.x > right && cy > l.y - l.r && cy < l.y + l.r && right > l.x - 2.0 * l.r && !l.is_sign()
        });
        let inside_char = sketch.letters.iter().any(|l| {
            l.x - l.r <= rect.left
                && l.x + l.r >= rect.right
                && l.y - l.r <= rect.top
                && l.y + l.r >= rect.bottom
        });

        let symmetric = (gb.y1 - gb.y2).abs() < 3
            && (gb.y1 + gb.y2 - gb.bottom - gb.top).abs() / 2 < 3
            && (gb.x1 - gb.x2).abs() < 3
            && (gb.x1 + gb.x2 - gb.right - gb.left).abs() / 2 < 3;
        let sign = if aspect < 0.7 && fill > 0.9 && !char_to_right && !inside_char {
            Some('-')
        } else if aspect > 0.7 && aspect < 1.0 / 0.7 && symmetric && !inside_char {
            Some('+')
        } else {
            None
        };
        if let Some(ch) = sign {
            place(sketch, ch, gb.left, gb.top, gb.right, gb.bottom)?;
            sketch.delete_curve_with_children(tree, path.id);
        }
    }
    Ok(())
}

/// Bonds connected to `start` through shared endpoints. Only bonds marked
/// 1 in `marks` are followed; each one reached is re-marked `visited`.
fn bond_component(sketch: &Sketch, start: usize, marks: &mut [u8], visited: u8) -> Vec<usize> {
    let mut component = Vec::new();
    let mut queue = VecDeque::from([start]);
    marks[start] = 2;
    while let Some(k) = queue.pop_front() {
        marks[k] = visited;
        component.push(k);
        let bk = &sketch.bonds[k];
        for (j, bj) in sketch.bonds.iter().enumerate() {
            if j != k
                && marks[j] == 1
                && (bk.a == bj.a || bk.a == bj.b || bk.b == bj.a || bk.b == bj.b)
            {
                marks[j] = 2;
                queue.push_back(j);
            }
        }
    }
    component
}

fn existing_marks(sketch: &Sketch) -> Vec<u8> {
    sketch.bonds.iter().map(|b| u8::from(b.exists)).collect()
}

/// Finds characters the tracer merged into the bond skeleton: clusters of
/// more than `size` short connected strokes fitting in one glyph box.
///
/// With a `placeholder` the cluster becomes that character unconditionally;
/// otherwise the recognizer is asked, and a handful of characters it
/// confuses with stroke junctions are rejected.
pub fn find_fused_chars(
    sketch: &mut Sketch,
    raster: &Raster,
    session: &mut dyn RecognizerSession,
    placeholder: Option<char>,
    font: FontSize,
    size: usize,
    tolerances: &Tolerances,
) -> Result<(), Error> {
    let dist = f64::from(font.width.max(font.height));
    let (fw, fh) = (f64::from(font.width), f64::from(font.height));
    let min_h = f64::from(tolerances.min_font_height);

    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists || sketch.bond_length(i) >= dist {
            continue;
        }
        let (ai, bi) = sketch.bond_points(i);
        let xmin1 = ai.x.min(bi.x);
        let xmax1 = ai.x.max(bi.x);
        let ymin1 = ai.y.min(bi.y);
        let ymax1 = ai.y.max(bi.y);

        let mut nearby = vec![i];
        for j in 0..sketch.bonds.len() {
            if j == i || !sketch.bonds[j].exists || sketch.bond_length(j) >= dist {
                continue;
            }
            let (aj, bj) = sketch.bond_points(j);
            if aj.x < xmin1 {
                continue;
            }
            let xmax2 = xmax1.max(aj.x.max(bj.x));
            let ymin2 = ymin1.min(aj.y.min(bj.y));
            let ymax2 = ymax1.max(aj.y.max(bj.y));
            if xmax2 - xmin1 <= fw && ymax2 - ymin2 <= fh {
                nearby.push(j);
            }
        }

        let mut marks = existing_marks(sketch);
        bond_component(sketch, i, &mut marks, 3);
        let cluster: Vec<usize> = nearby.into_iter().filter(|&k| marks[k] == 3).collect();
        if cluster.len() <= size {
            continue;
        }

        let (mut cx, mut cy) = (0.0, 0.0);
        let mut bounds = Rect::new(f64::MAX, f64::MAX, 0.0, 0.0);
        for &k in &cluster {
            let (a, b) = sketch.bond_points(k);
            cx += a.x + b.x;
            cy += a.y + b.y;
            bounds.include(a);
            bounds.include(b);
        }
        let n = (2 * cluster.len()) as f64;
        cx /= n;
        cy /= n;
        if bounds.width() <= min_h || bounds.height() <= min_h {
            continue;
        }

        let half_w = f64::from(font.width / 2);
        let half_h = f64::from(font.height / 2);
        let left = (cx - half_w) as i64 - 1;
        let right = (cx + half_w) as i64 - 1;
        let top = (cy - half_h) as i64;
        let bottom = (cy + half_h) as i64;
        let rect = int_rect(left, top, right, bottom);

        let label = match placeholder {
            Some(ch) => Some(ch),
            None => recognize_glyph(session, raster, rect).filter(|ch| !FUSED_REJECTS.contains(ch)),
        };
        let Some(ch) = label else {
            continue;
        };
        let (x, y) = (((left + right) / 2) as f64, ((top + bottom) / 2) as f64);
        let overlap = sketch
            .letters
            .iter()
            .any(|l| geometry::distance(x, y, l.x, l.y) < l.r);
        if !overlap {
            sketch.add_letter(ch, x, y, rect.half_diagonal())?;
        }
        sketch.delete_bonds_in_rect(rect);
    }
    Ok(())
}

/// Replaces clusters of more than `size` connected bonds smaller than a
/// glyph with a `*` placeholder letter.
pub fn clean_unrecognized_characters(
    sketch: &mut Sketch,
    font: FontSize,
    size: usize,
) -> Result<(), Error> {
    let mut marks = existing_marks(sketch);
    for i in 0..sketch.bonds.len() {
        if marks[i] != 1 {
            continue;
        }
        let component = bond_component(sketch, i, &mut marks, 0);
        let mut bounds = Rect::new(f64::MAX, f64::MAX, 0.0, 0.0);
        for &k in &component {
            let (a, b) = sketch.bond_points(k);
            bounds.include(a);
            bounds.include(b);
        }
        if bounds.width() < f64::from(font.width)
            && bounds.height() < f64::from(font.height)
            && component.len() > size
        {
            for &k in &component {
                sketch.bonds[k].exists = false;
            }
            let c = bounds.center();
            sketch.add_letter('*', c.x, c.y, bounds.half_diagonal())?;
        }
    }
    Ok(())
}

/// The vertical stroke of a chlorine `l`: a lone short upright bond right
/// beside a letter.
fn chlorine_stroke(sketch: &Sketch, bond: usize, max_font_height: f64, min_font_height: f64) -> bool {
    let (a, b) = sketch.bond_points(bond);
    let len = sketch.bond_length(bond);
    if len >= max_font_height || len <= min_font_height || (a.x - b.x).abs() >= (a.y - b.y).abs() {
        return false;
    }
    let mid = a.midpoint(b);
    let r = len / 2.0;
    sketch
        .letters
        .iter()
        .any(|l| mid.distance(l.point()) < r + l.r && (mid.y - l.y).abs() < r.min(l.r))
}

/// Drops stubs shorter than the wobble tolerance and turns lone upright
/// strokes next to letters into `l`.
pub fn remove_small_bonds(
    sketch: &mut Sketch,
    tree: &PathTree,
    font_height: u32,
    avg: f64,
    tolerances: &Tolerances,
) -> Result<(), Error> {
    let max_h = f64::from(font_height);
    let min_h = f64::from(tolerances.min_font_height);
    for i in 0..sketch.bonds.len() {
        if !sketch.bonds[i].exists || sketch.bonds[i].order != 1 {
            continue;
        }
        let alone = sketch.alone(i, tree, avg);
        if sketch.bond_length(i) < tolerances.v_displacement {
            sketch.bonds[i].exists = false;
        } else if alone && chlorine_stroke(sketch, i, max_h, min_h) {
            let (a, b) = sketch.bond_points(i);
            let mid = a.midpoint(b);
            let r = sketch.bond_length(i) / 2.0;
            sketch.add_letter('l', mid.x, mid.y, r)?;
            sketch.bonds[i].exists = false;
        }
    }
    Ok(())
}
