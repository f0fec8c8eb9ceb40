//! Configuration types for sketch recognition.
//!
//! This module defines all configuration structures used to control the
//! behavior of [`process_document`](super::process_document) and its
//! per-page and per-region building blocks.
//!
//! # Overview
//!
//! - [`ForgeConfig`] — Main configuration struct
//! - [`Tolerances`] — Named heuristic thresholds
//! - [`ResolutionPlan`] — Which resolutions to try
//! - [`ResolutionProfile`] — Parameters derived for one resolution
//! - [`Annotations`] — Extra fields attached to each result

mod resolution;
mod tolerance;

pub use resolution::{
    AUTO_RESOLUTIONS, MAX_WORKING_RESOLUTION, ResolutionPlan, ResolutionProfile,
};
pub use tolerance::Tolerances;

use crate::model::molecule::RecognizedStructure;

/// Default per-arena element limit.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Main configuration for sketch recognition.
///
/// # Examples
///
/// ```
/// use sketch_forge::{ForgeConfig, ResolutionPlan};
///
/// // Default configuration (all four resolutions)
/// let default = ForgeConfig::default();
///
/// // Single resolution with a custom darkness threshold
/// let custom = ForgeConfig {
///     resolution: ResolutionPlan::Fixed(300),
///     threshold: Some(0.3),
///     ..Default::default()
/// };
/// assert_eq!(custom.capacity, default.capacity);
/// ```
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Heuristic thresholds.
    pub tolerances: Tolerances,

    /// Resolutions to try.
    pub resolution: ResolutionPlan,

    /// Darkness threshold in `[0, 1]`.
    ///
    /// If `None`, a resolution-dependent default from [`Tolerances`] is used.
    pub threshold: Option<f64>,

    /// Maximum number of atoms, bonds and letters per region.
    pub capacity: usize,

    /// Custom label dictionary in TOML format.
    ///
    /// If `None`, uses the embedded `default.dictionary.toml`.
    pub dictionary: Option<String>,

    /// Fields attached to each emitted structure.
    pub annotations: Annotations,

    /// Input is a jagged upsampled scan; treat 150 dpi strokes as thick.
    pub jaggy: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            resolution: ResolutionPlan::Auto,
            threshold: None,
            capacity: DEFAULT_CAPACITY,
            dictionary: None,
            annotations: Annotations::default(),
            jaggy: false,
        }
    }
}

/// Which metadata to attach to each recognized structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Annotations {
    pub confidence: bool,
    pub resolution: bool,
    pub page: bool,
    pub coordinates: bool,
    pub bond_length: bool,
}

impl Annotations {
    /// Every field enabled.
    pub fn all() -> Self {
        Self {
            confidence: true,
            resolution: true,
            page: true,
            coordinates: true,
            bond_length: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Named values for the enabled fields, in a fixed order.
    ///
    /// Pages are reported one-based; coordinates as `x1,y1,x2,y2`.
    pub fn fields(&self, structure: &RecognizedStructure) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if self.confidence {
            fields.push(("Confidence", format!("{:.4}", structure.confidence)));
        }
        if self.resolution {
            fields.push(("Resolution", structure.resolution.to_string()));
        }
        if self.page {
            fields.push(("Page", (structure.page + 1).to_string()));
        }
        if self.coordinates {
            let b = structure.bbox;
            fields.push(("Coordinates", format!("{},{},{},{}", b.x1, b.y1, b.x2, b.y2)));
        }
        if self.bond_length {
            fields.push(("Bond Length", format!("{:.2}", structure.bond_length)));
        }
        fields
    }

    /// The structure text followed by the enabled fields, space separated.
    pub fn render_line(&self, structure: &RecognizedStructure) -> String {
        let mut line = structure.structure.trim_end().to_string();
        for (_, value) in self.fields(structure) {
            line.push(' ');
            line.push_str(&value);
        }
        line
    }
}
