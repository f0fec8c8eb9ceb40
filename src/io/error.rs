use super::Format;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },

    #[error("failed to decode page image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid trace scene: {0}")]
    Scene(String),
}

impl Error {
    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }

    /// Creates a scene validation error.
    ///
    /// # Arguments
    ///
    /// * `details` - What is wrong with the scene.
    ///
    /// # Returns
    ///
    /// A new `Error::Scene` variant.
    pub fn scene(details: impl Into<String>) -> Self {
        Self::Scene(details.into())
    }

    /// Converts a TOML deserialization error into a `Parse` error, locating
    /// the line from the error span.
    pub(crate) fn from_toml(format: Format, source: &str, e: toml::de::Error) -> Self {
        let line = e
            .span()
            .map(|span| source[..span.start.min(source.len())].matches('\n').count() + 1)
            .unwrap_or(0);
        Self::parse(format, line, e.message())
    }
}
