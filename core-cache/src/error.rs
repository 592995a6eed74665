use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    /// A stored record could not be decoded
    #[error("Corrupt cache record {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
