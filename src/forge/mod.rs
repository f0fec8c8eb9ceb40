mod bonds;
mod cleanup;
mod collab;
mod config;
mod dictionary;
mod error;
mod fragments;
mod glyphs;
mod labels;
mod page;
mod raster;
mod reaction;
mod region;
mod repair;
mod select;
mod skeleton;
mod statistics;
mod stereo;

pub use collab::{
    CharRecognizer, MoleculeBuilder, Placement, Preprocess, ReactionFormatter, RecognizerSession,
    Vectorizer,
};
pub use config::{
    AUTO_RESOLUTIONS, Annotations, DEFAULT_CAPACITY, ForgeConfig, MAX_WORKING_RESOLUTION,
    ResolutionPlan, ResolutionProfile, Tolerances,
};
pub use dictionary::{Dictionary, default_dictionary, load_dictionary};
pub use error::Error;
pub use page::{Collaborators, DocumentResult, Page, PageResult, process_document, process_page};
pub use raster::{NoiseFactor, Raster};
pub use reaction::arrange_reactions;
pub use region::{ForgedRegion, PreparedRegion, forge_region, prepare_region, recognize_fragments};
pub use select::{BondLimits, ResolutionRun, find_limits_on_avg_bond};
pub use statistics::{confidence, molecule_statistics, sketch_statistics};

/// Recognizes a single page image with the default flow of
/// [`process_document`].
///
/// # Errors
///
/// Returns [`Error::DictionaryParse`] for an invalid custom dictionary.
pub fn forge(page: &Page, collaborators: Collaborators<'_>, config: &ForgeConfig) -> Result<PageResult, Error> {
    let mut document = process_document(std::slice::from_ref(page), collaborators, config)?;
    Ok(document.pages.pop().unwrap_or_default())
}
