//! Error taxonomy for the analysis pipeline.
//!
//! Every fatal pipeline failure maps to one of these variants; the
//! orchestrator wraps them with the failing stage name before they reach
//! the CLI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No supported application version was detected at the source directory.
    #[error("no supported application version detected")]
    VersionUnknown,

    /// The decryptor needs a key and none could be resolved from the
    /// configuration or environment.
    #[error("no decryption key available (is the application running and logged in?)")]
    MissingCredentials,

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The chat store could not be read. Fatal when enumerating contacts;
    /// recoverable (skip the contact) when reading one contact's messages.
    #[error("chat store unavailable: {0}")]
    DataUnavailable(String),

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("port {0} is already in use")]
    PortInUse(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

// Store-layer errors surface as DataUnavailable; callers decide whether
// the failure is fatal for the run or only for one contact.
impl From<sqlx::Error> for AnalysisError {
    fn from(e: sqlx::Error) -> Self {
        AnalysisError::DataUnavailable(e.to_string())
    }
}

impl From<walkdir::Error> for AnalysisError {
    fn from(e: walkdir::Error) -> Self {
        AnalysisError::DecryptionFailed(e.to_string())
    }
}
