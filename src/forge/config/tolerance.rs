//! Named heuristic constants.
//!
//! Distances are in working-resolution pixels unless noted. Font limits are
//! specified at 150 dpi and scaled to the working resolution by
//! [`ResolutionProfile`](super::ResolutionProfile).

/// Every tunable threshold used by the recognition passes.
///
/// The defaults reproduce the behavior the passes were calibrated for; most
/// callers never change them.
///
/// # Examples
///
/// ```
/// use sketch_forge::Tolerances;
///
/// let strict = Tolerances {
///     parallel_cosine: 0.98,
///     ..Default::default()
/// };
/// assert_eq!(strict.v_displacement, 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerances {
    /// Minimum |cosine| for two strokes to count as parallel.
    pub parallel_cosine: f64,
    /// Maximum sideways wobble of points that still lie on one line.
    pub v_displacement: f64,
    /// Widest separation at which two parallel strokes are one thick stroke.
    pub max_bond_thickness: f64,
    /// Perpendicular deviation that marks a direction change on an outline.
    pub dir_change: f64,
    /// Largest glyph height at 150 dpi.
    pub max_font_height: u32,
    /// Largest glyph width at 150 dpi.
    pub max_font_width: u32,
    /// Smallest glyph height at any resolution.
    pub min_font_height: u32,
    /// Darkness threshold for resolutions of 150 dpi and above.
    pub threshold_global: f64,
    /// Darkness threshold below 150 dpi.
    pub threshold_low_res: f64,
    /// Blank margin added around a region before tracing.
    pub frame: u32,
    /// Largest outline area that can be a hash mark.
    pub max_dash: f64,
    /// Region area (in 72 dpi square points) below which tracing favors ink.
    pub small_picture_area: f64,
    /// Fragments need strictly more atoms than this.
    pub min_atom_count: usize,
    /// Regions with this many atoms or bonds are not molecules.
    pub max_atom_count: usize,
    /// Pages with this many fragments in one region are rejected.
    pub max_fragments: usize,
    /// Document size at which the bond-length outlier filter applies.
    pub structure_count: usize,
    /// Upper bound on sweeps of any fixed-point repair loop.
    pub max_sweeps: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            parallel_cosine: 0.95,
            v_displacement: 3.0,
            max_bond_thickness: 10.0,
            dir_change: 2.0,
            max_font_height: 22,
            max_font_width: 21,
            min_font_height: 5,
            threshold_global: 0.4,
            threshold_low_res: 0.1,
            frame: 5,
            max_dash: 40.0,
            small_picture_area: 6000.0,
            min_atom_count: 5,
            max_atom_count: 250,
            max_fragments: 10,
            structure_count: 20,
            max_sweeps: 1000,
        }
    }
}
