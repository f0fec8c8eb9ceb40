//! One region of a page at one resolution candidate: preparing the bitmap,
//! running the ordered recognition passes, and turning the surviving
//! fragments into positioned structures.

use super::collab::{MoleculeBuilder, Placement, RecognizerSession};
use super::config::{ForgeConfig, ResolutionProfile, Tolerances};
use super::dictionary::Dictionary;
use super::error::Error;
use super::glyphs::FontSize;
use super::raster::Raster;
use super::{bonds, cleanup, fragments, glyphs, labels, repair, skeleton, stereo};
use crate::model::geometry::Point;
use crate::model::molecule::{BoundingBox, Fragment, RecognizedStructure};
use crate::model::path::PathTree;
use crate::model::sketch::Sketch;

/// Resolution at and above which the stroke-width histogram is consulted.
const NOISE_RESOLUTION: u32 = 300;

/// A region bitmap ready for tracing.
#[derive(Debug, Clone)]
pub struct PreparedRegion {
    /// Region pixels at the working resolution, used for glyphs, marks and
    /// stroke widths.
    pub ink: Raster,
    /// The bitmap the outlines are traced from: `ink`, thinned for thick
    /// strokes.
    pub strokes: Raster,
    pub profile: ResolutionProfile,
    pub placement: Placement,
}

/// Crops `region` (page pixels) out of the page and rescales it to the
/// working resolution of `profile`.
///
/// At 300 dpi and above the stroke-width histogram is computed; with
/// `reestimate` the region is resampled to the resolution the dominant
/// stroke width suggests, or treated as thin-stroked 500 dpi when strokes
/// are narrow. Candidates between 150 and 300 dpi are upsampled to 300.
/// `page_scale` converts page pixels back to the caller's original pixels.
pub fn prepare_region(
    page: &Raster,
    region: BoundingBox,
    page_scale: f64,
    mut profile: ResolutionProfile,
    reestimate: bool,
    config: &ForgeConfig,
) -> PreparedRegion {
    let tolerances = &config.tolerances;
    let frame = tolerances.frame;
    let mut ink = page.framed_region(
        region.x1.max(0) as u32,
        region.y1.max(0) as u32,
        region.x2.max(0) as u32,
        region.y2.max(0) as u32,
        frame,
        profile.threshold,
    );
    let mut box_scale = 1.0;

    if profile.resolution >= NOISE_RESOLUTION {
        let noise = ink.noise_factor();
        tracing::debug!(
            factor = noise.factor,
            max_hist = noise.max_hist,
            nf45 = noise.nf45,
            "stroke width histogram"
        );
        if reestimate {
            let target = if noise.max_hist > 6 {
                noise.max_hist as u32 * NOISE_RESOLUTION / 4
            } else {
                profile.thick = false;
                500
            };
            box_scale /= resample(&mut ink, target);
            profile.resolution = target;
            profile.working_resolution = NOISE_RESOLUTION;
        }
        if config.jaggy {
            ink = ink.scaled(0.5);
            box_scale *= 2.0;
            profile.working_resolution = 150;
        }
    } else if profile.resolution > 150 {
        box_scale /= resample(&mut ink, profile.resolution);
        profile.working_resolution = NOISE_RESOLUTION;
    }
    profile.rescale_fonts(tolerances);

    let working = f64::from(profile.working_resolution);
    let area_pt = (f64::from(ink.width()) * 72.0 / working) * (f64::from(ink.height()) * 72.0 / working);
    let placement = Placement {
        origin: Point::new(
            page_scale * f64::from(region.x1 - frame as i32),
            page_scale * f64::from(region.y1 - frame as i32),
        ),
        scale: page_scale * box_scale,
        small_picture: area_pt < tolerances.small_picture_area,
    };
    let strokes = if profile.thick { ink.thin() } else { ink.clone() };
    PreparedRegion {
        ink,
        strokes,
        profile,
        placement,
    }
}

/// Rescales a region drawn at `resolution` to the noise resolution and
/// returns the factor applied.
fn resample(ink: &mut Raster, resolution: u32) -> f64 {
    let percent = 100 * NOISE_RESOLUTION / resolution;
    let factor = f64::from(percent) / 100.0;
    *ink = ink.scaled(factor);
    factor
}

/// The sketch of a region after every pass, with its fragments in reading
/// order.
#[derive(Debug, Clone)]
pub struct ForgedRegion {
    pub sketch: Sketch,
    /// Representative bond length in region pixels.
    pub avg: f64,
    pub fragments: Vec<Fragment>,
}

/// Whether a finished sketch plausibly holds a molecule.
fn plausible(sketch: &Sketch, tolerances: &Tolerances) -> bool {
    let atoms = sketch.count_atoms();
    let (bonds, max_order) = sketch.count_bonds();
    atoms > tolerances.min_atom_count
        && atoms < tolerances.max_atom_count
        && bonds < tolerances.max_atom_count
        && max_order > 0
        && max_order < 5
}

/// Runs the full pass sequence over one traced region.
///
/// `ink` is the region image the glyphs, marks and stroke widths are read
/// from; `strokes` is the (possibly thinned) image the outlines were traced
/// from. Returns `None` when the result is too small, too large, or has no
/// usable bonds to be a molecule.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for a malformed outline tree and
/// [`Error::CapacityExceeded`] when the sketch outgrows its arenas.
pub fn forge_region(
    tree: &PathTree,
    prepared: &PreparedRegion,
    session: &mut dyn RecognizerSession,
    dictionary: &Dictionary,
    config: &ForgeConfig,
) -> Result<Option<ForgedRegion>, Error> {
    if let Some((id, detail)) = tree.find_malformed() {
        return Err(Error::invalid_path(id, detail));
    }
    let tol = &config.tolerances;
    let profile = &prepared.profile;
    let (ink, strokes) = (&prepared.ink, &prepared.strokes);
    let thick = profile.thick;
    let working = profile.working_resolution;
    let mut sketch = Sketch::new(config.capacity);

    skeleton::find_atoms(tree, &mut sketch, tol)?;
    let max_font = FontSize::new(profile.max_font_width, profile.max_font_height);
    let font = glyphs::find_chars(tree, ink, &mut sketch, session, max_font, tol)?;

    let mut avg = cleanup::percentile75(&sketch);
    let max_area = if thick { avg } else { avg * 5.0 };
    glyphs::find_plus_minus(tree, &mut sketch, font, ink.width(), ink.height())?;
    bonds::find_small_bonds(tree, &mut sketch, max_area, avg / 2.0, 5.0)?;
    stereo::find_old_aromatic_bonds(tree, &mut sketch, avg, tol);

    let dist = if working < 150 { 2.0 } else { 3.0 };
    let stroke_width = bonds::skeletize(&mut sketch, strokes, dist, avg, tol);
    cleanup::remove_disconnected_atoms(&mut sketch);
    repair::collapse_atoms(&mut sketch, 3.0, tol);
    cleanup::remove_zero_bonds(&mut sketch);

    glyphs::find_fused_chars(&mut sketch, ink, session, None, font, 3, tol)?;
    glyphs::find_fused_chars(&mut sketch, ink, session, Some('*'), font, 5, tol)?;
    repair::flatten_bonds(&mut sketch, 3.0, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    avg = cleanup::percentile75(&sketch);

    let max_dist_double = bonds::dist_double_bonds(&mut sketch, avg, tol);
    bonds::double_triple_bonds(&mut sketch, avg, max_dist_double, tol)?;
    let max_dash = tol.max_dash.max((avg / 3.0).trunc());
    stereo::find_dashed_bonds(tree, &mut sketch, ink, max_dash, avg, avg, thick, tol)?;
    glyphs::remove_small_bonds(&mut sketch, tree, font.height, avg, tol)?;

    let dist = match working {
        w if w < 150 => 2.0,
        w if w < 300 => 3.0,
        _ => 4.0,
    };
    repair::fix_one_sided_bonds(&mut sketch, dist, avg, tol)?;
    glyphs::clean_unrecognized_characters(&mut sketch, font, 4)?;
    let thickness = stereo::find_wedge_bonds(&mut sketch, ink, max_dist_double, avg, 3.0, 1, tol);
    tracing::debug!(stroke_width, thickness, avg, max_dist_double, "line metrics");

    labels::assemble_labels(&mut sketch);
    cleanup::remove_disconnected_atoms(&mut sketch);
    repair::collapse_atoms(&mut sketch, thickness, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    repair::flatten_bonds(&mut sketch, 2.0 * thickness, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    avg = cleanup::percentile75(&sketch);

    stereo::collapse_double_bonds(&mut sketch, max_dist_double);
    repair::extend_terminal_bond_to_label(&mut sketch, avg / 2.0, thickness, max_dist_double);
    cleanup::remove_disconnected_atoms(&mut sketch);
    repair::collapse_atoms(&mut sketch, thickness, tol);
    cleanup::collapse_doubleup_bonds(&mut sketch);
    cleanup::remove_zero_bonds(&mut sketch);
    repair::flatten_bonds(&mut sketch, thickness, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    cleanup::remove_disconnected_atoms(&mut sketch);

    repair::extend_terminal_bond_to_bonds(&mut sketch, avg, 2.0 * thickness, max_dist_double, tol);
    repair::collapse_atoms(&mut sketch, 3.0, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    repair::flatten_bonds(&mut sketch, 3.0, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    glyphs::clean_unrecognized_characters(&mut sketch, font, 0)?;

    labels::assign_charge(&mut sketch, dictionary);
    stereo::find_up_down_bonds(&mut sketch, thickness);

    if !plausible(&sketch, tol) {
        tracing::debug!(
            atoms = sketch.count_atoms(),
            bonds = sketch.count_bonds().0,
            "region is not a molecule"
        );
        return Ok(None);
    }

    fragments::resolve_bridge_bonds(&mut sketch, 2.0 * thickness);
    repair::collapse_bonds(&mut sketch, avg / 4.0);
    repair::collapse_atoms(&mut sketch, 3.0, tol);
    cleanup::remove_zero_bonds(&mut sketch);
    repair::extend_terminal_bond_to_bonds(&mut sketch, avg, 7.0, 0.0, tol);
    repair::remove_small_terminal_bonds(&mut sketch, avg, tol);
    repair::reconnect_fragments(&mut sketch, avg)?;
    repair::collapse_atoms(&mut sketch, 1.0, tol);
    repair::mark_terminal_atoms(&mut sketch);

    let fragments = fragments::fragments_in_reading_order(&sketch);
    tracing::debug!(
        atoms = sketch.count_atoms(),
        bonds = sketch.count_bonds().0,
        letters = sketch.letters.len(),
        fragments = fragments.len(),
        "region forged"
    );
    Ok(Some(ForgedRegion {
        sketch,
        avg,
        fragments,
    }))
}

/// Builds every large enough fragment and keeps the structures the builder
/// accepts, positioned on the page.
pub fn recognize_fragments(
    forged: &ForgedRegion,
    placement: &Placement,
    resolution: u32,
    page: usize,
    builder: &dyn MoleculeBuilder,
    dictionary: &Dictionary,
    tolerances: &Tolerances,
) -> Vec<RecognizedStructure> {
    let mut structures = Vec::new();
    for fragment in forged
        .fragments
        .iter()
        .filter(|f| f.atoms.len() > tolerances.min_atom_count)
    {
        let molecule = fragments::fragment_molecule(&forged.sketch, fragment, forged.avg, dictionary);
        let Some(built) = builder.build(&molecule) else {
            continue;
        };
        let stats = built.statistics;
        if built.text.trim().is_empty()
            || stats.fragments == 0
            || stats.fragments >= tolerances.max_fragments
            || stats.num_atoms <= tolerances.min_atom_count
            || stats.num_bonds == 0
        {
            continue;
        }
        let r = placement.rect_to_page(fragment.bbox.to_rect());
        structures.push(RecognizedStructure {
            structure: built.text,
            confidence: built.confidence,
            resolution,
            page,
            bbox: BoundingBox::new(r.left as i32, r.top as i32, r.right as i32, r.bottom as i32),
            bond_length: placement.scale * forged.avg,
        });
    }
    structures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::dictionary::default_dictionary;
    use crate::forge::raster::tests::{fill_rect, make_canvas};
    use crate::forge::statistics::{confidence, molecule_statistics};
    use crate::model::molecule::{BuiltStructure, Molecule};
    use crate::model::sketch::tests::make_sketch;

    struct CountingBuilder;

    impl MoleculeBuilder for CountingBuilder {
        fn build(&self, molecule: &Molecule) -> Option<BuiltStructure> {
            Some(BuiltStructure {
                text: format!("C{}", molecule.atoms.len()),
                confidence: confidence(molecule),
                statistics: molecule_statistics(molecule),
            })
        }
    }

    fn make_page() -> Raster {
        let mut img = make_canvas(200, 200);
        fill_rect(&mut img, 40, 40, 140, 42);
        Raster::new(img, 0.4)
    }

    fn make_chain(atoms: usize, offset: f64) -> Vec<(f64, f64)> {
        (0..atoms).map(|k| (offset + 20.0 * k as f64, 10.0)).collect()
    }

    #[test]
    fn low_resolution_region_is_framed_but_not_scaled() {
        let config = ForgeConfig::default();
        let profile = ResolutionProfile::new(72, &config.tolerances, None, false);
        let prepared = prepare_region(&make_page(), BoundingBox::new(40, 30, 140, 60), 1.0, profile, false, &config);

        assert_eq!(prepared.ink.width(), 101 + 2 * 5);
        assert_eq!(prepared.placement.origin, Point::new(35.0, 25.0));
        assert_eq!(prepared.placement.scale, 1.0);
        assert!(prepared.placement.small_picture);
        assert!(!prepared.profile.thick);
    }

    #[test]
    fn mid_resolution_region_is_upsampled_to_working_resolution() {
        let config = ForgeConfig::default();
        let profile = ResolutionProfile::new(200, &config.tolerances, None, false);
        let prepared = prepare_region(&make_page(), BoundingBox::new(40, 30, 140, 60), 2.0, profile, false, &config);

        assert_eq!(prepared.profile.working_resolution, 300);
        assert_eq!(prepared.profile.max_font_height, 44);
        assert!((prepared.placement.scale - 2.0 / 1.5).abs() < 1e-9);
        assert_eq!(prepared.ink.width(), 167);
    }

    #[test]
    fn tiny_sketch_fails_the_molecule_gate() {
        let sketch = make_sketch(&make_chain(3, 0.0), &[(0, 1), (1, 2)]);
        assert!(!plausible(&sketch, &Tolerances::default()));
        let sketch = make_sketch(&make_chain(7, 0.0), &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6)]);
        assert!(plausible(&sketch, &Tolerances::default()));
    }

    #[test]
    fn small_fragments_are_not_built() {
        let mut points = make_chain(7, 0.0);
        points.extend(make_chain(3, 300.0));
        let sketch = make_sketch(
            &points,
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (7, 8), (8, 9)],
        );
        let forged = ForgedRegion {
            fragments: fragments::fragments_in_reading_order(&sketch),
            sketch,
            avg: 20.0,
        };
        let placement = Placement {
            origin: Point::new(100.0, 50.0),
            scale: 2.0,
            small_picture: false,
        };
        let structures = recognize_fragments(
            &forged,
            &placement,
            300,
            1,
            &CountingBuilder,
            default_dictionary(),
            &Tolerances::default(),
        );

        assert_eq!(structures.len(), 1);
        let s = &structures[0];
        assert_eq!(s.structure, "C7");
        assert_eq!(s.bbox, BoundingBox::new(100, 70, 340, 70));
        assert_eq!(s.bond_length, 40.0);
        assert_eq!((s.page, s.resolution), (1, 300));
    }
}
