//! Error types for profile validation, credential resolution and config generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for profile processing.
///
/// "Needs more input" conditions are never errors; the resolver and the
/// connect pipeline report those as ordinary return values.
#[derive(Error, Debug)]
pub enum Error {
    /// A supplied secret was rejected (wrong PKCS12 password, bad login data)
    #[error("Credential rejected: {0}")]
    Credential(String),

    /// Keystore or archive access failed; carries the platform reason
    #[error("Certificate access failed: {0}")]
    Certificate(String),

    /// An invariant the validator should have caught reached the compiler
    #[error("Illegal configuration: {0}")]
    IllegalConfiguration(String),

    /// I/O errors (trust-bundle supplier, profile store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile store serialization errors
    #[error("Profile encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new credential error.
    pub fn credential<S: Into<String>>(msg: S) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a new certificate error.
    pub fn certificate<S: Into<String>>(msg: S) -> Self {
        Self::Certificate(msg.into())
    }

    /// Create a new illegal-configuration error.
    pub fn illegal<S: Into<String>>(msg: S) -> Self {
        Self::IllegalConfiguration(msg.into())
    }

    /// Check whether re-prompting the user for a secret can fix this error.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }
}
