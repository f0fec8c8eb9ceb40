use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use sketch_forge::io::molfile::{MolfileBuilder, RxnFormatter, write_sdf_record};
use sketch_forge::{Collaborators, DocumentResult, ForgeConfig, ReactionFormatter, process_document};

use crate::cli::RecognizeArgs;
use crate::config::{build_forge_config, resolution_name};
use crate::display::{Context as DisplayContext, Progress, Stage, print_page_summary, print_structures};
use crate::io::{create_output, read_page_image, read_scene, stdout_is_tty};
use crate::util::path::numbered;

pub fn run_recognize(args: RecognizeArgs, ctx: DisplayContext) -> Result<()> {
    let config = build_forge_config(&args.recognition, &args.annotations)?;

    let mut progress = Progress::new(ctx.interactive);

    progress.begin(Stage::ReadPage);
    let image = read_page_image(&args.io.input)?;
    let scene = read_scene(&args.io.trace)?;
    let (width, height) = image.dimensions();
    let page = scene.page(image);
    progress.done(
        Stage::ReadPage,
        &[
            format!("Decode image ({width} × {height} px)"),
            format!(
                "Load trace ({} outlines, {} glyphs, {} regions)",
                scene.paths.len(),
                scene.glyphs.len(),
                page.regions.len()
            ),
        ],
    );

    progress.begin(Stage::Recognize);
    let builder = MolfileBuilder;
    let formatter = RxnFormatter;
    let collaborators = Collaborators {
        vectorizer: &scene,
        recognizer: &scene,
        builder: &builder,
        formatter: args
            .io
            .rxn
            .is_some()
            .then_some(&formatter as &dyn ReactionFormatter),
    };
    let document = process_document(std::slice::from_ref(&page), collaborators, &config)
        .context("Recognition failed")?;
    progress.done(Stage::Recognize, &recognize_substeps(&document, &config));

    if ctx.interactive {
        print_page_summary(&document, &config);
        print_structures(&document);
    }

    progress.begin(Stage::WriteOutput);
    let written = write_outputs(&args, &document, &config)?;
    progress.done(Stage::WriteOutput, &written);

    progress.finish();

    Ok(())
}

fn recognize_substeps(document: &DocumentResult, config: &ForgeConfig) -> Vec<String> {
    let mut steps = vec![format!("Try resolutions: {}", resolution_name(config.resolution))];
    for page in &document.pages {
        steps.push(match page.resolution {
            Some(r) => format!("Page {}: kept {} structures at {r} dpi", page.page + 1, page.structures.len()),
            None => format!("Page {}: nothing recognized", page.page + 1),
        });
    }
    let reactions = document.reactions().count();
    if reactions > 0 {
        steps.push(format!("Assemble {reactions} reactions"));
    }
    steps
}

fn write_outputs(args: &RecognizeArgs, document: &DocumentResult, config: &ForgeConfig) -> Result<Vec<String>> {
    let mut written = Vec::new();

    let mut out = create_output(args.io.output.as_deref())?;
    for structure in document.structures() {
        write_sdf_record(&mut out, structure, &config.annotations).context("Failed to write SDF record")?;
    }
    out.flush().context("Failed to flush SDF output")?;
    let target = match &args.io.output {
        Some(p) => p.display().to_string(),
        None if stdout_is_tty() => "terminal".to_string(),
        None => "stdout".to_string(),
    };
    written.push(format!("{} SDF records → {target}", document.structures().count()));

    if let Some(base) = &args.io.rxn {
        let paths: Vec<PathBuf> = document
            .reactions()
            .enumerate()
            .map(|(i, reaction)| -> Result<PathBuf> {
                let path = numbered(base, i);
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create reaction file: {}", path.display()))?;
                let mut w = BufWriter::new(file);
                w.write_all(reaction.as_bytes())?;
                w.flush()?;
                Ok(path)
            })
            .collect::<Result<_>>()?;
        for path in paths {
            written.push(format!("RXN → {}", path.display()));
        }
    }

    Ok(written)
}
