//! Resolution candidates and the parameters derived from each.

use super::tolerance::Tolerances;

/// Resolutions tried when none is fixed, in dpi.
pub const AUTO_RESOLUTIONS: [u32; 4] = [72, 150, 300, 500];

/// Resolution the font limits in [`Tolerances`] are expressed at.
const FONT_REFERENCE_RESOLUTION: u32 = 150;

/// Highest resolution the passes operate at; larger inputs are downscaled.
pub const MAX_WORKING_RESOLUTION: u32 = 300;

/// Which rendering resolutions to try per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPlan {
    /// Try every entry of [`AUTO_RESOLUTIONS`] and keep the best.
    #[default]
    Auto,
    /// Use a single resolution.
    Fixed(u32),
}

impl ResolutionPlan {
    pub fn candidates(&self) -> Vec<u32> {
        match self {
            Self::Auto => AUTO_RESOLUTIONS.to_vec(),
            Self::Fixed(r) => vec![*r],
        }
    }
}

/// Parameters for one resolution candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionProfile {
    pub resolution: u32,
    pub working_resolution: u32,
    /// Darkness threshold in `[0, 1]`.
    pub threshold: f64,
    pub max_font_width: u32,
    pub max_font_height: u32,
    /// Strokes are thick enough to need thinning before tracing.
    pub thick: bool,
}

impl ResolutionProfile {
    /// Derives the profile for `resolution`.
    ///
    /// # Arguments
    ///
    /// * `resolution` — Candidate resolution in dpi
    /// * `tolerances` — Font limits and default thresholds
    /// * `threshold` — Explicit darkness threshold overriding the defaults
    /// * `jaggy` — Treat 150 dpi input as thick (jagged, upsampled scans)
    pub fn new(resolution: u32, tolerances: &Tolerances, threshold: Option<f64>, jaggy: bool) -> Self {
        let working_resolution = resolution.min(MAX_WORKING_RESOLUTION);
        let threshold = threshold.unwrap_or(if resolution >= FONT_REFERENCE_RESOLUTION {
            tolerances.threshold_global
        } else {
            tolerances.threshold_low_res
        });
        let thick = resolution > FONT_REFERENCE_RESOLUTION
            || (resolution == FONT_REFERENCE_RESOLUTION && jaggy);
        let mut profile = Self {
            resolution,
            working_resolution,
            threshold,
            max_font_width: 0,
            max_font_height: 0,
            thick,
        };
        profile.rescale_fonts(tolerances);
        profile
    }

    /// Recomputes the font limits after `working_resolution` changed.
    pub fn rescale_fonts(&mut self, tolerances: &Tolerances) {
        self.max_font_width =
            tolerances.max_font_width * self.working_resolution / FONT_REFERENCE_RESOLUTION;
        self.max_font_height =
            tolerances.max_font_height * self.working_resolution / FONT_REFERENCE_RESOLUTION;
    }

    /// Whether a region of `width × height` page pixels may hold a molecule
    /// rather than a lone label.
    pub fn admits_region(&self, width: i32, height: i32) -> bool {
        let (fw, fh) = (self.max_font_width as i32, self.max_font_height as i32);
        width > fw && height > fh && (width > 2 * fw || height > 2 * fh)
    }
}
