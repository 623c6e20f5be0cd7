//! Error types for the viewer core.

use thiserror::Error;

use crate::loader::AssetKind;

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Classified reason an asset load failed.
///
/// Loads are not retried automatically; the failure is surfaced to the
/// state machine and the viewer parks in `Failed` until re-initialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Transport-level failure (HTTP error status, connection loss, disk I/O).
    #[error("network error: {0}")]
    Network(String),
    /// The bytes arrived but could not be decoded as the expected format.
    #[error("decode error: {0}")]
    Decode(String),
    /// The resource does not exist at the configured address.
    #[error("asset not found: {0}")]
    NotFound(String),
}

/// A load failure paired with the asset that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{asset} load failed: {error}")]
pub struct LoadFailure {
    /// Which of the two stack assets failed.
    pub asset: AssetKind,
    /// Why it failed.
    pub error: LoadError,
}

/// Errors surfaced by the viewer API itself.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// `initialize` was called while a load cycle or orbit session is live.
    #[error("viewer already initialized")]
    AlreadyInitialized,
    /// Configuration could not be parsed or serialized.
    #[error("config error: {0}")]
    Config(String),
    /// File I/O error (config load/save).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
