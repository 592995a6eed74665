//! Error types for manifest retrieval

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    /// Transport failure or non-success HTTP status
    #[error("Manifest fetch failed: {message}")]
    Fetch {
        message: String,
        /// HTTP status when the server answered
        status: Option<u16>,
    },

    /// The body was not a usable manifest document
    #[error("Manifest parse failed: {0}")]
    Parse(String),
}

impl ManifestError {
    pub fn fetch(message: impl Into<String>) -> Self {
        ManifestError::Fetch {
            message: message.into(),
            status: None,
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, ManifestError::Fetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
