use thiserror::Error;

/// Failure reported by a host bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot provide the capability at all (no vault, no audio
    /// device, client construction failed).
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    /// The capability exists but this call failed: a network error, a media
    /// load failure, a vault read error.
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
