//! Error taxonomy shared by the store, inference, and pipeline layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaathiError {
    /// A service could not be initialized. Fatal for the session.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The store or its subscription failed. Recoverable by reconnecting.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The inference call failed or returned nothing usable.
    #[error("classification error: {0}")]
    Classification(String),

    /// A classified response carried malformed or missing fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// Signing in with a token was refused.
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("no identity established")]
    NotAuthenticated,

    #[error("a submission is already in flight")]
    Busy,
}

impl SaathiError {
    /// Wrap an initialization failure, keeping its full context chain.
    pub fn configuration(e: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{e:#}"))
    }
}

impl From<rusqlite::Error> for SaathiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Connectivity(e.to_string())
    }
}

impl From<reqwest::Error> for SaathiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Classification(e.to_string())
    }
}

impl From<tokio::task::JoinError> for SaathiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Connectivity(format!("store task failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, SaathiError>;
