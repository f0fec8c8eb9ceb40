use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sforge",
    about = "Chemical structure recognition from traced line-art",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Recognize structures and reactions on a traced page
    #[command(visible_alias = "r")]
    Recognize(RecognizeArgs),
}

/// I/O options of the recognize command.
#[derive(Args)]
pub struct IoOptions {
    /// Page image (PNG)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Trace scene with outlines, glyphs, regions, arrows and plus marks (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub trace: PathBuf,

    /// SDF output file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// RXN output file; further reactions get a numbered suffix
    #[arg(long, value_name = "FILE")]
    pub rxn: Option<PathBuf>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Recognition options.
#[derive(Args)]
#[command(next_help_heading = "Recognition")]
pub struct RecognitionOptions {
    /// Fixed page resolution in dpi (tries 72, 150, 300 and 500 if omitted)
    #[arg(short, long, value_name = "DPI", value_parser = clap::value_parser!(u32).range(1..))]
    pub resolution: Option<u32>,

    /// Gray level threshold between 0 and 1 (per-resolution default if omitted)
    #[arg(long, value_name = "T")]
    pub threshold: Option<f64>,

    /// Smooth jagged low-quality scans by downscaling regions
    #[arg(short, long)]
    pub jaggy: bool,

    /// Custom label dictionary (TOML with [spelling] and [superatoms])
    #[arg(long, value_name = "FILE")]
    pub dictionary: Option<PathBuf>,

    /// Sketch arena capacity per region
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,
}

/// Which annotations to attach to each SDF record.
#[derive(Args)]
#[command(next_help_heading = "Annotations")]
pub struct AnnotationOptions {
    /// Attach the confidence estimate
    #[arg(long)]
    pub show_confidence: bool,

    /// Attach the resolution that produced the structure
    #[arg(long)]
    pub show_resolution: bool,

    /// Attach the page number
    #[arg(long)]
    pub show_page: bool,

    /// Attach the bounding box in page pixels
    #[arg(long)]
    pub show_coordinates: bool,

    /// Attach the average bond length in page pixels
    #[arg(long)]
    pub show_bond_length: bool,
}

#[derive(Args)]
pub struct RecognizeArgs {
    #[command(flatten)]
    pub io: IoOptions,

    #[command(flatten)]
    pub recognition: RecognitionOptions,

    #[command(flatten)]
    pub annotations: AnnotationOptions,
}

pub fn parse() -> Cli {
    Cli::parse()
}
