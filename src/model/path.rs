//! Vectorized outlines produced by the curve tracer.
//!
//! A [`PathTree`] lists closed outlines in traversal order. Each outline is a
//! sequence of corner or Bézier segments; holes are attached to their
//! enclosing outline as children. Sketch elements refer back to the outline
//! they came from through its [`PathId`].

use std::collections::HashMap;

use super::geometry::{Point, Rect};

/// Opaque identifier of a traced outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(pub u32);

/// Whether an outline encloses ink (`Positive`) or a hole (`Negative`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSign {
    Positive,
    Negative,
}

/// Segment kind as emitted by the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTag {
    /// Two straight lines meeting at `c[1]`, ending at `c[2]`.
    Corner,
    /// Cubic Bézier with control points `c[0]`, `c[1]`, ending at `c[2]`.
    Curve,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub tag: SegmentTag,
    pub c: [Point; 3],
}

impl Segment {
    pub fn corner(vertex: Point, end: Point) -> Self {
        Self {
            tag: SegmentTag::Corner,
            c: [Point::default(), vertex, end],
        }
    }

    pub fn curve(c0: Point, c1: Point, end: Point) -> Self {
        Self {
            tag: SegmentTag::Curve,
            c: [c0, c1, end],
        }
    }

    pub fn end(&self) -> Point {
        self.c[2]
    }
}

/// One closed outline.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub id: PathId,
    pub sign: PathSign,
    /// Enclosed area in square pixels.
    pub area: f64,
    pub segments: Vec<Segment>,
    /// Holes and nested outlines directly inside this one.
    pub children: Vec<PathId>,
}

/// A point of an outline with its corner flag, in skeleton order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlinePoint {
    pub point: Point,
    pub corner: bool,
}

impl VectorPath {
    pub fn is_positive(&self) -> bool {
        self.sign == PathSign::Positive
    }

    /// End point of the last segment, which is also where the outline starts.
    pub fn start(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    /// All characteristic points: the start point, then every corner vertex
    /// or pair of control points, then every segment end except the last.
    pub fn outline_points(&self) -> Vec<OutlinePoint> {
        let mut points = Vec::with_capacity(self.segments.len() * 3 + 1);
        if let Some(start) = self.start() {
            points.push(OutlinePoint {
                point: start,
                corner: false,
            });
        }
        let last = self.segments.len().saturating_sub(1);
        for (i, seg) in self.segments.iter().enumerate() {
            match seg.tag {
                SegmentTag::Corner => points.push(OutlinePoint {
                    point: seg.c[1],
                    corner: true,
                }),
                SegmentTag::Curve => {
                    points.push(OutlinePoint {
                        point: seg.c[0],
                        corner: false,
                    });
                    points.push(OutlinePoint {
                        point: seg.c[1],
                        corner: false,
                    });
                }
            }
            if i != last {
                points.push(OutlinePoint {
                    point: seg.c[2],
                    corner: false,
                });
            }
        }
        points
    }

    /// Bounding box over the characteristic points.
    pub fn bounding_box(&self) -> Option<Rect> {
        let points = self.outline_points();
        let first = points.first()?;
        let mut rect = Rect::at(first.point);
        for p in &points[1..] {
            rect.include(p.point);
        }
        Some(rect)
    }

    /// Mean of the characteristic points.
    pub fn centroid(&self) -> Option<Point> {
        let points = self.outline_points();
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.point.x, sy + p.point.y));
        Some(Point::new(sx / n, sy / n))
    }
}

/// All outlines of one traced bitmap.
#[derive(Debug, Clone, Default)]
pub struct PathTree {
    paths: Vec<VectorPath>,
    by_id: HashMap<PathId, usize>,
}

impl PathTree {
    pub fn new(paths: Vec<VectorPath>) -> Self {
        let by_id = paths.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        Self { paths, by_id }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Outlines in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, VectorPath> {
        self.paths.iter()
    }

    pub fn get(&self, id: PathId) -> Option<&VectorPath> {
        self.by_id.get(&id).map(|&i| &self.paths[i])
    }

    /// Direct children of `id`; empty for unknown ids.
    pub fn children(&self, id: PathId) -> &[PathId] {
        self.get(id).map(|p| p.children.as_slice()).unwrap_or(&[])
    }

    /// First outline violating the tree's structural rules, if any:
    /// an empty segment list, a duplicate id, or a child id that is unknown.
    pub fn find_malformed(&self) -> Option<(PathId, &'static str)> {
        if self.by_id.len() != self.paths.len() {
            let mut seen = std::collections::HashSet::new();
            for p in &self.paths {
                if !seen.insert(p.id) {
                    return Some((p.id, "duplicate path id"));
                }
            }
        }
        for p in &self.paths {
            if p.segments.is_empty() {
                return Some((p.id, "outline has no segments"));
            }
            if p.children.iter().any(|c| !self.by_id.contains_key(c)) {
                return Some((p.id, "outline references an unknown child"));
            }
        }
        None
    }
}
