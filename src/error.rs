use std::path::PathBuf;
use thiserror::Error;

use crate::transport::TransportError;

/// Top-level error type for the library surface (configuration, snapshots, input parsing).
#[derive(Debug, Error)]
pub enum MitscanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown domain: {name}")]
    UnknownDomain { name: String },

    #[error("Invalid hex input: {message}")]
    InvalidHex { message: String },

    #[error("Domain {domain} does not read a raw bit-packed source")]
    NotBitPacked { domain: String },

    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type Result<T> = std::result::Result<T, MitscanError>;

impl MitscanError {
    pub fn snapshot<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Snapshot { path: path.into(), message: message.into() }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn unknown_domain<S: Into<String>>(name: S) -> Self {
        Self::UnknownDomain { name: name.into() }
    }

    pub fn invalid_hex<S: Into<String>>(message: S) -> Self {
        Self::InvalidHex { message: message.into() }
    }

    pub fn not_bit_packed<S: Into<String>>(domain: S) -> Self {
        Self::NotBitPacked { domain: domain.into() }
    }

    pub fn path_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::PathNotFound { path: path.into() }
    }
}

/// Raised by the decoder when a raw blob cannot carry even the oldest known layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{layout}: raw data is {actual} bytes, at least {minimum} required")]
    TooShort { layout: &'static str, actual: usize, minimum: usize },

    #[error("TPM response malformed: {message}")]
    MalformedResponse { message: String },
}

impl DecodeError {
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse { message: message.into() }
    }
}

/// Per-domain failure. Never aborts sibling domains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The information is not exposed by this OS build.
    #[error("not available on this system ({code})")]
    Unavailable { code: String },

    /// The privileged query returned an unexpected status.
    #[error("query failed with {code}")]
    QueryFailed { code: String },

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl DomainError {
    /// Returns true for the expected "not on this build" outcome, which is not logged as a failure
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        if err.is_unavailable() {
            Self::Unavailable { code: err.symbol() }
        } else {
            Self::QueryFailed { code: err.symbol() }
        }
    }
}
