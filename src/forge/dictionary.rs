//! Label dictionary: spelling fixes and abbreviation expansions.
//!
//! The default dictionary is compiled in from `resources/default.dictionary.toml`
//! and parsed once; callers can supply their own TOML with the same layout.

use super::error::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const DEFAULT_DICTIONARY_TOML: &str = include_str!("../../resources/default.dictionary.toml");

static DEFAULT_DICTIONARY: OnceLock<Dictionary> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dictionary {
    /// Misread label → intended label.
    #[serde(default)]
    pub spelling: HashMap<String, String>,
    /// Abbreviation → SMILES fragment attached through its first atom.
    #[serde(default)]
    pub superatoms: HashMap<String, String>,
}

impl Dictionary {
    /// Normalizes a recognized label for an atom with bond order sum `valence`.
    ///
    /// Single letters are upper-cased, a hydrogen carrying more than one bond
    /// is read as carbon, and known misspellings are replaced.
    pub fn normalize(&self, label: &str, valence: u32) -> String {
        let mut chars = label.chars();
        let mut fixed = match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_uppercase().collect(),
            _ => label.to_string(),
        };
        if fixed == "H" && valence > 1 {
            fixed = "C".to_string();
        }
        match self.spelling.get(label).or_else(|| self.spelling.get(&fixed)) {
            Some(corrected) => corrected.clone(),
            None => fixed,
        }
    }

    /// SMILES fragment for an abbreviation, if known.
    pub fn expansion(&self, label: &str) -> Option<&str> {
        self.superatoms.get(label).map(String::as_str)
    }
}

pub fn load_dictionary(custom_toml: Option<&str>) -> Result<Dictionary, Error> {
    match custom_toml {
        Some(toml) => {
            let dictionary: Dictionary = toml::from_str(toml)?;
            Ok(dictionary)
        }
        None => Ok(default_dictionary().clone()),
    }
}

pub fn default_dictionary() -> &'static Dictionary {
    DEFAULT_DICTIONARY.get_or_init(|| {
        toml::from_str(DEFAULT_DICTIONARY_TOML)
            .expect("Failed to parse embedded default dictionary. This is a library bug.")
    })
}
