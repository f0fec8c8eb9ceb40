use anyhow::{Context, Result, bail};

use sketch_forge::{Annotations, DEFAULT_CAPACITY, ForgeConfig, ResolutionPlan};

use crate::cli::{AnnotationOptions, RecognitionOptions};

pub fn build_annotations(opts: &AnnotationOptions) -> Annotations {
    Annotations {
        confidence: opts.show_confidence,
        resolution: opts.show_resolution,
        page: opts.show_page,
        coordinates: opts.show_coordinates,
        bond_length: opts.show_bond_length,
    }
}

pub fn build_forge_config(
    opts: &RecognitionOptions,
    annotations: &AnnotationOptions,
) -> Result<ForgeConfig> {
    if let Some(t) = opts.threshold {
        if !(0.0..=1.0).contains(&t) {
            bail!("Threshold must lie between 0 and 1, got {t}");
        }
    }

    let dictionary = opts
        .dictionary
        .as_ref()
        .map(|p| {
            std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read dictionary file: {}", p.display()))
        })
        .transpose()?;

    Ok(ForgeConfig {
        resolution: opts
            .resolution
            .map_or(ResolutionPlan::Auto, ResolutionPlan::Fixed),
        threshold: opts.threshold,
        capacity: opts.capacity.unwrap_or(DEFAULT_CAPACITY),
        dictionary,
        annotations: build_annotations(annotations),
        jaggy: opts.jaggy,
        ..Default::default()
    })
}

pub fn resolution_name(plan: ResolutionPlan) -> String {
    match plan {
        ResolutionPlan::Auto => "auto (72/150/300/500 dpi)".to_string(),
        ResolutionPlan::Fixed(r) => format!("{r} dpi"),
    }
}
