use thiserror::Error;

/// Failure reported by a host bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot provide this capability at all
    #[error("Capability not available: {0}")]
    NotAvailable(String),

    /// Transport or host call failure
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The surface could not turn a payload into pixels
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
