//! Page and document drivers.
//!
//! Pages run in parallel. Each page opens its own recognizer session, tries
//! every resolution candidate over its regions, and keeps the candidate with
//! the best mean confidence. Once all pages are done, structures with an
//! outlying bond length are dropped and reactions are assembled per page.

use image::GrayImage;
use rayon::prelude::*;

use super::collab::{CharRecognizer, MoleculeBuilder, ReactionFormatter, RecognizerSession, Vectorizer};
use super::config::{AUTO_RESOLUTIONS, ForgeConfig, MAX_WORKING_RESOLUTION, ResolutionPlan, ResolutionProfile};
use super::dictionary::{Dictionary, load_dictionary};
use super::error::Error;
use super::fragments::sort_reading_order;
use super::raster::Raster;
use super::reaction::arrange_reactions;
use super::region::{forge_region, prepare_region, recognize_fragments};
use super::select::{BondLimits, ResolutionRun, best_run, filter_on_avg_bond};
use crate::model::geometry::Point;
use crate::model::molecule::{BoundingBox, RecognizedStructure};
use crate::model::reaction::Arrow;

/// One page of input: the grayscale image and what was found on it.
///
/// Regions are candidate drawing areas in page pixels; arrows and plus
/// signs are only used for reaction assembly.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub image: GrayImage,
    pub regions: Vec<BoundingBox>,
    pub arrows: Vec<Arrow>,
    pub pluses: Vec<Point>,
}

/// The caller-supplied collaborators shared by all pages.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub vectorizer: &'a dyn Vectorizer,
    pub recognizer: &'a dyn CharRecognizer,
    pub builder: &'a dyn MoleculeBuilder,
    /// Reactions are only assembled when a formatter is given.
    pub formatter: Option<&'a dyn ReactionFormatter>,
}

/// Everything recognized on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub page: usize,
    /// The resolution candidate whose structures were kept.
    pub resolution: Option<u32>,
    pub structures: Vec<RecognizedStructure>,
    pub reactions: Vec<String>,
}

impl PageResult {
    fn empty(page: usize) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }
}

/// Everything recognized in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub pages: Vec<PageResult>,
    /// Bond-length interval structures had to fall into.
    pub limits: BondLimits,
}

impl DocumentResult {
    pub fn structures(&self) -> impl Iterator<Item = &RecognizedStructure> {
        self.pages.iter().flat_map(|p| p.structures.iter())
    }

    pub fn reactions(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.reactions.iter().map(String::as_str))
    }
}

/// Per-page state: the page's own recognizer session and shared settings.
struct PageContext<'a> {
    page: usize,
    session: Box<dyn RecognizerSession + 'a>,
    collaborators: Collaborators<'a>,
    dictionary: &'a Dictionary,
    config: &'a ForgeConfig,
}

impl<'a> PageContext<'a> {
    fn open(
        page: usize,
        collaborators: Collaborators<'a>,
        dictionary: &'a Dictionary,
        config: &'a ForgeConfig,
    ) -> Self {
        Self {
            page,
            session: collaborators.recognizer.open_session(),
            collaborators,
            dictionary,
            config,
        }
    }

    /// Recognizes every admissible region at one resolution candidate.
    fn run_resolution(
        &mut self,
        raster: &Raster,
        regions: &[BoundingBox],
        page_scale: f64,
        resolution: u32,
        reestimate: bool,
    ) -> ResolutionRun {
        let config = self.config;
        let profile = ResolutionProfile::new(resolution, &config.tolerances, config.threshold, config.jaggy);
        let mut run = ResolutionRun::new(resolution);

        for region in regions.iter().filter(|r| profile.admits_region(r.width(), r.height())) {
            let prepared = prepare_region(raster, *region, page_scale, profile, reestimate, config);
            self.session.set_placement(&prepared.placement);
            let traced = self
                .collaborators
                .vectorizer
                .trace_region(&prepared.strokes.binarize(), &prepared.placement)
                .and_then(|tree| forge_region(&tree, &prepared, self.session.as_mut(), self.dictionary, config));
            match traced {
                Ok(Some(forged)) => run.structures.extend(recognize_fragments(
                    &forged,
                    &prepared.placement,
                    prepared.profile.resolution,
                    self.page,
                    self.collaborators.builder,
                    self.dictionary,
                    &config.tolerances,
                )),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    page = self.page,
                    resolution,
                    region = ?region,
                    error = %e,
                    "region dropped"
                ),
            }
        }
        tracing::info!(
            page = self.page,
            resolution,
            structures = run.structures.len(),
            confidence = run.mean_confidence().unwrap_or(0.0),
            "resolution finished"
        );
        run
    }
}

/// Factor a page drawn at more than the working resolution is shrunk by.
fn page_factor(plan: ResolutionPlan) -> f64 {
    match plan {
        ResolutionPlan::Fixed(r) if r > MAX_WORKING_RESOLUTION => {
            f64::from(100 * MAX_WORKING_RESOLUTION / r) / 100.0
        }
        _ => 1.0,
    }
}

fn scale_box(b: BoundingBox, factor: f64) -> BoundingBox {
    let s = |v: i32| (f64::from(v) * factor) as i32;
    BoundingBox::new(s(b.x1), s(b.y1), s(b.x2), s(b.y2))
}

/// Recognizes the structures on one page, keeping the best resolution.
///
/// # Errors
///
/// Returns [`Error::EmptyPage`] when the image has no pixels. Failures in
/// individual regions are logged and skipped.
pub fn process_page(
    index: usize,
    page: &Page,
    collaborators: Collaborators<'_>,
    dictionary: &Dictionary,
    config: &ForgeConfig,
) -> Result<PageResult, Error> {
    if page.image.width() == 0 || page.image.height() == 0 {
        return Err(Error::EmptyPage { page: index });
    }
    let mut context = PageContext::open(index, collaborators, dictionary, config);

    let factor = page_factor(config.resolution);
    let mut raster = Raster::new(page.image.clone(), config.tolerances.threshold_global);
    if factor < 1.0 {
        raster = raster.scaled(factor);
    }
    let mut regions: Vec<BoundingBox> = page.regions.iter().map(|&b| scale_box(b, factor)).collect();
    sort_reading_order(&mut regions, |b| *b);

    let auto = config.resolution == ResolutionPlan::Auto;
    let runs: Vec<ResolutionRun> = config
        .resolution
        .candidates()
        .into_iter()
        .map(|resolution| {
            let reestimate = auto && resolution == AUTO_RESOLUTIONS[AUTO_RESOLUTIONS.len() - 1];
            context.run_resolution(&raster, &regions, 1.0 / factor, resolution, reestimate)
        })
        .collect();

    let best = best_run(runs);
    let resolution = best.as_ref().map(|r| r.resolution);
    let structures = best.map(|r| r.structures).unwrap_or_default();
    tracing::info!(page = index, ?resolution, structures = structures.len(), "page finished");
    Ok(PageResult {
        page: index,
        resolution,
        structures,
        reactions: Vec::new(),
    })
}

/// Recognizes every page of a document.
///
/// Pages are processed in parallel and returned in order. When enough
/// structures were found, those with an outlying bond length are dropped;
/// then reactions are assembled per page if a formatter was supplied.
///
/// # Errors
///
/// Returns [`Error::DictionaryParse`] when the configured dictionary is not
/// valid TOML. Nothing else aborts the document: a failing page is logged
/// and contributes no structures.
pub fn process_document(
    pages: &[Page],
    collaborators: Collaborators<'_>,
    config: &ForgeConfig,
) -> Result<DocumentResult, Error> {
    let dictionary = load_dictionary(config.dictionary.as_deref())?;

    let mut results: Vec<PageResult> = pages
        .par_iter()
        .enumerate()
        .map(|(index, page)| {
            process_page(index, page, collaborators, &dictionary, config).unwrap_or_else(|e| {
                tracing::warn!(page = index, error = %e, "page dropped");
                PageResult::empty(index)
            })
        })
        .collect();

    let mut structures: Vec<Vec<RecognizedStructure>> =
        results.iter_mut().map(|r| std::mem::take(&mut r.structures)).collect();
    let limits = filter_on_avg_bond(&mut structures, config.tolerances.structure_count);
    for (result, kept) in results.iter_mut().zip(structures) {
        result.structures = kept;
    }

    if let Some(formatter) = collaborators.formatter {
        for (result, page) in results.iter_mut().zip(pages) {
            if !page.arrows.is_empty() {
                result.reactions =
                    arrange_reactions(page.arrows.clone(), &result.structures, &page.pluses, formatter);
            }
        }
    }
    Ok(DocumentResult {
        pages: results,
        limits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::collab::{Placement, Preprocess};
    use crate::io::molfile::MolfileBuilder;
    use crate::io::scene::Scene;
    use crate::model::geometry::Rect;
    use crate::model::molecule::{BuiltStructure, Molecule};
    use crate::model::path::PathTree;

    struct BlankVectorizer;

    impl Vectorizer for BlankVectorizer {
        fn trace(&self, _bitmap: &GrayImage) -> Result<PathTree, Error> {
            Ok(PathTree::new(Vec::new()))
        }
    }

    struct FailingVectorizer;

    impl Vectorizer for FailingVectorizer {
        fn trace(&self, _bitmap: &GrayImage) -> Result<PathTree, Error> {
            Err(Error::vectorizer("no tracer"))
        }
    }

    struct SilentSession;

    impl RecognizerSession for SilentSession {
        fn recognize(&mut self, _raster: &GrayImage, _rect: Rect, _preprocess: Preprocess) -> Option<char> {
            None
        }

        fn set_placement(&mut self, _placement: &Placement) {}
    }

    struct SilentRecognizer;

    impl CharRecognizer for SilentRecognizer {
        fn open_session(&self) -> Box<dyn RecognizerSession + '_> {
            Box::new(SilentSession)
        }
    }

    struct NoBuilder;

    impl MoleculeBuilder for NoBuilder {
        fn build(&self, _molecule: &Molecule) -> Option<BuiltStructure> {
            None
        }
    }

    fn make_page(regions: Vec<BoundingBox>) -> Page {
        Page {
            image: GrayImage::from_pixel(200, 200, image::Luma([255])),
            regions,
            ..Default::default()
        }
    }

    fn make_hexagon(radius: f64, cx: f64, cy: f64) -> Vec<(f64, f64)> {
        (0..6)
            .map(|k| {
                let t = std::f64::consts::FRAC_PI_3 * f64::from(k);
                (cx + radius * t.cos(), cy + radius * t.sin())
            })
            .collect()
    }

    /// A closed outline through `corners`, one corner segment per side.
    fn make_path_toml(id: u32, sign: &str, corners: &[(f64, f64)], children: &[u32]) -> String {
        let segments: Vec<String> = corners
            .iter()
            .zip(corners.iter().cycle().skip(1))
            .map(|(&(x, y), &(nx, ny))| {
                format!(
                    "{{ corner = [{x:.2}, {y:.2}], end = [{:.2}, {:.2}] }}",
                    (x + nx) / 2.0,
                    (y + ny) / 2.0
                )
            })
            .collect();
        format!(
            "[[paths]]\nid = {id}\nsign = \"{sign}\"\nchildren = {children:?}\nsegments = [\n{}\n]\n",
            segments.join(",\n")
        )
    }

    fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
        p.distance(Point::new(a.x + t * dx, a.y + t * dy))
    }

    /// Toluene drawn as a 40 px hexagon centred at (100, 100) with a methyl
    /// stroke to the right, plus the traced outline of the drawing.
    fn make_toluene_scene() -> (Page, Scene) {
        let (cx, cy) = (100.0, 100.0);
        let ring: Vec<Point> = make_hexagon(40.0, cx, cy)
            .into_iter()
            .map(|(x, y)| Point::new(x, y))
            .collect();

        let mut ink = GrayImage::from_pixel(200, 200, image::Luma([255]));
        for y in 0..200u32 {
            for x in 0..200u32 {
                let p = Point::new(f64::from(x), f64::from(y));
                let on_ring = (0..6).any(|i| distance_to_segment(p, ring[i], ring[(i + 1) % 6]) <= 1.5);
                let on_methyl = p.x >= cx + 39.0 && p.x <= cx + 80.0 && (p.y - cy).abs() <= 1.5;
                if on_ring || on_methyl {
                    ink.put_pixel(x, y, image::Luma([0]));
                }
            }
        }

        let mut outer = vec![
            (cx + 40.9, cy - 1.5),
            (cx + 80.0, cy - 1.5),
            (cx + 80.0, cy + 1.5),
            (cx + 40.9, cy + 1.5),
        ];
        outer.extend(make_hexagon(41.7, cx, cy).into_iter().skip(1));
        let toml = format!(
            "regions = [[50, 55, 185, 145]]\n{}{}",
            make_path_toml(1, "positive", &outer, &[2]),
            make_path_toml(2, "negative", &make_hexagon(38.3, cx, cy), &[]),
        );
        let scene = Scene::from_toml_str(&toml).unwrap();
        (scene.page(ink), scene)
    }

    #[test]
    fn toluene_outline_becomes_one_structure() {
        let (page, scene) = make_toluene_scene();
        let builder = MolfileBuilder;
        let collaborators = Collaborators {
            vectorizer: &scene,
            recognizer: &scene,
            builder: &builder,
            formatter: None,
        };
        let config = ForgeConfig {
            resolution: ResolutionPlan::Fixed(72),
            ..Default::default()
        };

        let result = process_document(std::slice::from_ref(&page), collaborators, &config).unwrap();

        assert_eq!(result.pages[0].resolution, Some(72));
        let structures: Vec<&RecognizedStructure> = result.structures().collect();
        assert_eq!(structures.len(), 1);
        let structure = structures[0];
        assert_eq!(structure.bbox, BoundingBox::new(60, 65, 180, 134));
        assert!(structure.confidence > 0.0);
        assert!((structure.bond_length - 40.0).abs() < 2.0);

        let counts = structure.structure.lines().nth(3).unwrap();
        assert_eq!(&counts[..6], "  7  7");
    }

    #[test]
    fn page_factor_only_shrinks_fixed_high_resolutions() {
        assert_eq!(page_factor(ResolutionPlan::Auto), 1.0);
        assert_eq!(page_factor(ResolutionPlan::Fixed(300)), 1.0);
        assert_eq!(page_factor(ResolutionPlan::Fixed(600)), 0.5);
    }

    #[test]
    fn empty_image_is_an_error() {
        let collaborators = Collaborators {
            vectorizer: &BlankVectorizer,
            recognizer: &SilentRecognizer,
            builder: &NoBuilder,
            formatter: None,
        };
        let page = Page::default();
        let err = process_page(3, &page, collaborators, &Dictionary::default(), &ForgeConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyPage { page: 3 }));
    }

    #[test]
    fn failing_regions_and_pages_do_not_abort_the_document() {
        let collaborators = Collaborators {
            vectorizer: &FailingVectorizer,
            recognizer: &SilentRecognizer,
            builder: &NoBuilder,
            formatter: None,
        };
        let pages = vec![make_page(vec![BoundingBox::new(10, 10, 150, 150)]), Page::default()];
        let result = process_document(&pages, collaborators, &ForgeConfig::default()).unwrap();

        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[1].page, 1);
        assert_eq!(result.structures().count(), 0);
        assert!(result.pages.iter().all(|p| p.resolution.is_none()));
        assert_eq!(result.limits, BondLimits::UNBOUNDED);
    }

    #[test]
    fn bad_dictionary_is_reported() {
        let collaborators = Collaborators {
            vectorizer: &BlankVectorizer,
            recognizer: &SilentRecognizer,
            builder: &NoBuilder,
            formatter: None,
        };
        let config = ForgeConfig {
            dictionary: Some("spelling = [".to_string()),
            ..Default::default()
        };
        let err = process_document(&[], collaborators, &config).unwrap_err();
        assert!(matches!(err, Error::DictionaryParse(_)));
    }
}
