//! TOML trace scenes.
//!
//! A scene records what an external tracer and OCR engine saw on one page,
//! in page pixels:
//!
//! ```toml
//! regions = [[10, 10, 200, 160]]
//! pluses = [[240.0, 80.0]]
//!
//! [[arrows]]
//! tail = [260.0, 80.0]
//! head = [320.0, 80.0]
//!
//! [[paths]]
//! id = 1
//! sign = "positive"
//! children = [2]
//! segments = [
//!     { corner = [40.0, 20.0], end = [40.0, 30.0] },
//!     { control = [[40.0, 40.0], [30.0, 40.0]], end = [20.0, 40.0] },
//! ]
//!
//! [[glyphs]]
//! char = "O"
//! rect = [120.0, 40.0, 132.0, 56.0]
//! ```
//!
//! Path `area` may be given explicitly; otherwise it is the polygon area of
//! the outline's characteristic points. A loaded [`Scene`] replays the
//! outlines as a [`Vectorizer`] and answers glyph queries as a
//! [`CharRecognizer`].

use std::path::Path;

use image::GrayImage;
use serde::Deserialize;

use super::Format;
use super::error::Error;
use crate::forge::Error as ForgeError;
use crate::forge::{CharRecognizer, Page, Placement, Preprocess, RecognizerSession, Vectorizer};
use crate::model::geometry::{Point, Rect};
use crate::model::molecule::BoundingBox;
use crate::model::path::{PathId, PathSign, PathTree, Segment, VectorPath};
use crate::model::reaction::Arrow;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawSign {
    Positive,
    Negative,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSegment {
    corner: Option<[f64; 2]>,
    control: Option<[[f64; 2]; 2]>,
    end: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPath {
    id: u32,
    #[serde(default)]
    sign: Option<RawSign>,
    area: Option<f64>,
    segments: Vec<RawSegment>,
    #[serde(default)]
    children: Vec<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGlyph {
    char: char,
    rect: [f64; 4],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArrow {
    tail: [f64; 2],
    head: [f64; 2],
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScene {
    #[serde(default)]
    regions: Vec<[i32; 4]>,
    #[serde(default)]
    arrows: Vec<RawArrow>,
    #[serde(default)]
    pluses: Vec<[f64; 2]>,
    #[serde(default)]
    paths: Vec<RawPath>,
    #[serde(default)]
    glyphs: Vec<RawGlyph>,
}

fn point([x, y]: [f64; 2]) -> Point {
    Point::new(x, y)
}

/// A glyph answer of the OCR table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub rect: Rect,
}

/// One page's pre-traced outlines and recognized glyphs.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub paths: Vec<VectorPath>,
    pub glyphs: Vec<Glyph>,
    pub regions: Vec<BoundingBox>,
    pub arrows: Vec<Arrow>,
    pub pluses: Vec<Point>,
}

/// Shoelace area of the outline's characteristic points.
fn outline_area(path: &VectorPath) -> f64 {
    let points = path.outline_points();
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (p, q) = (points[i].point, points[(i + 1) % n].point);
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice.abs() / 2.0
}

fn convert_path(raw: RawPath) -> Result<VectorPath, Error> {
    let segments = raw
        .segments
        .into_iter()
        .map(|s| match (s.corner, s.control) {
            (Some(vertex), None) => Ok(Segment::corner(point(vertex), point(s.end))),
            (None, Some([c0, c1])) => Ok(Segment::curve(point(c0), point(c1), point(s.end))),
            _ => Err(Error::scene(format!(
                "path {}: a segment needs exactly one of `corner` or `control`",
                raw.id
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if segments.is_empty() {
        return Err(Error::scene(format!("path {} has no segments", raw.id)));
    }
    let mut path = VectorPath {
        id: PathId(raw.id),
        sign: match raw.sign {
            Some(RawSign::Negative) => PathSign::Negative,
            _ => PathSign::Positive,
        },
        area: 0.0,
        segments,
        children: raw.children.into_iter().map(PathId).collect(),
    };
    path.area = raw.area.unwrap_or_else(|| outline_area(&path));
    Ok(path)
}

impl Scene {
    /// Parses a scene from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed TOML and [`Error::Scene`] for
    /// outlines that do not form a valid path tree.
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        let raw: RawScene = toml::from_str(source).map_err(|e| Error::from_toml(Format::Scene, source, e))?;
        let paths = raw.paths.into_iter().map(convert_path).collect::<Result<Vec<_>, _>>()?;
        if let Some((id, detail)) = PathTree::new(paths.clone()).find_malformed() {
            return Err(Error::scene(format!("path {}: {detail}", id.0)));
        }
        Ok(Self {
            paths,
            glyphs: raw
                .glyphs
                .into_iter()
                .map(|g| Glyph {
                    ch: g.char,
                    rect: Rect::new(g.rect[0], g.rect[1], g.rect[2], g.rect[3]),
                })
                .collect(),
            regions: raw
                .regions
                .into_iter()
                .map(|[x1, y1, x2, y2]| BoundingBox::new(x1, y1, x2, y2))
                .collect(),
            arrows: raw
                .arrows
                .into_iter()
                .map(|a| Arrow::new(point(a.tail), point(a.head)))
                .collect(),
            pluses: raw.pluses.into_iter().map(point).collect(),
        })
    }

    /// Reads and parses a scene file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Pairs the scene with its page image.
    ///
    /// A scene without regions treats the whole image as one region.
    pub fn page(&self, image: GrayImage) -> Page {
        let regions = if self.regions.is_empty() && image.width() > 0 && image.height() > 0 {
            vec![BoundingBox::new(0, 0, image.width() as i32 - 1, image.height() as i32 - 1)]
        } else {
            self.regions.clone()
        };
        Page {
            image,
            regions,
            arrows: self.arrows.clone(),
            pluses: self.pluses.clone(),
        }
    }

    /// Outlines whose centroid lies in `area`, mapped into region pixels.
    fn paths_in(&self, area: Rect, placement: &Placement) -> PathTree {
        let kept: Vec<&VectorPath> = self
            .paths
            .iter()
            .filter(|p| p.centroid().is_some_and(|c| area.contains(c)))
            .collect();
        let ids: std::collections::HashSet<PathId> = kept.iter().map(|p| p.id).collect();
        let to_region = |p: Point| placement.to_region(p);
        let paths = kept
            .into_iter()
            .map(|p| VectorPath {
                id: p.id,
                sign: p.sign,
                area: p.area / (placement.scale * placement.scale),
                segments: p
                    .segments
                    .iter()
                    .map(|s| Segment {
                        tag: s.tag,
                        c: s.c.map(to_region),
                    })
                    .collect(),
                children: p.children.iter().copied().filter(|c| ids.contains(c)).collect(),
            })
            .collect();
        PathTree::new(paths)
    }
}

impl Vectorizer for Scene {
    fn trace(&self, _bitmap: &GrayImage) -> Result<PathTree, ForgeError> {
        Ok(PathTree::new(self.paths.clone()))
    }

    fn trace_region(&self, bitmap: &GrayImage, placement: &Placement) -> Result<PathTree, ForgeError> {
        if placement.scale <= 0.0 {
            return Err(ForgeError::vectorizer("region placement has no scale"));
        }
        let area = placement.rect_to_page(Rect::new(
            0.0,
            0.0,
            f64::from(bitmap.width()),
            f64::from(bitmap.height()),
        ));
        Ok(self.paths_in(area, placement))
    }
}

/// Answers glyph queries from the scene's table.
pub struct SceneSession<'a> {
    glyphs: &'a [Glyph],
    placement: Placement,
}

impl SceneSession<'_> {
    /// The glyph centered inside `rect` (page pixels) closest to its center.
    fn lookup(&self, rect: Rect) -> Option<char> {
        let center = rect.center();
        self.glyphs
            .iter()
            .filter(|g| rect.contains(g.rect.center()))
            .min_by(|a, b| {
                center
                    .distance(a.rect.center())
                    .total_cmp(&center.distance(b.rect.center()))
            })
            .map(|g| g.ch)
    }
}

impl RecognizerSession for SceneSession<'_> {
    fn recognize(&mut self, _raster: &GrayImage, rect: Rect, preprocess: Preprocess) -> Option<char> {
        // The table holds final answers; retries cannot change them.
        if preprocess != Preprocess::Raw {
            return None;
        }
        self.lookup(self.placement.rect_to_page(rect))
    }

    fn set_placement(&mut self, placement: &Placement) {
        self.placement = *placement;
    }
}

impl CharRecognizer for Scene {
    fn open_session(&self) -> Box<dyn RecognizerSession + '_> {
        Box::new(SceneSession {
            glyphs: &self.glyphs,
            placement: Placement::default(),
        })
    }
}
