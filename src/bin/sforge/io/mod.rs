use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;

use sketch_forge::io::scene::Scene;

/// Returns `true` if stderr is a terminal (interactive).
pub fn stderr_is_tty() -> bool {
    io::stderr().is_terminal()
}

/// Returns `true` if stdout is a terminal (interactive).
pub fn stdout_is_tty() -> bool {
    io::stdout().is_terminal()
}

/// Decodes the page image and converts it to grayscale.
pub fn read_page_image(path: &Path) -> Result<GrayImage> {
    let image = image::open(path)
        .map_err(sketch_forge::io::Error::from)
        .with_context(|| format!("Failed to read page image: {}", path.display()))?;
    Ok(image.to_luma8())
}

pub fn read_scene(path: &Path) -> Result<Scene> {
    Scene::read(path).with_context(|| format!("Failed to read trace scene: {}", path.display()))
}

/// Opens the SDF destination: the given file, or stdout when no path is set.
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
