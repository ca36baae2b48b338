//! Centralized error types for nthmail.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to remove a content-transfer-encoding from part bytes.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The part declared `base64` but the payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The quoted-printable decoder rejected the payload.
    #[error("invalid quoted-printable payload: {0}")]
    InvalidQuotedPrintable(#[from] quoted_printable::QuotedPrintableError),
}

/// All errors produced by the nthmail library.
///
/// Every variant is fatal to the parse call that produced it; no partial
/// message is ever returned alongside an error.
#[derive(Error, Debug)]
pub enum MailError {
    /// The header block could not be framed at all.
    #[error("malformed message: header block cannot be framed")]
    MalformedMessage,

    /// A body was requested but the content type is missing or unparseable.
    #[error("cannot determine content type: {0:?}")]
    CannotDetermineContentType(String),

    /// Top-level multipart subtype other than `alternative` or `mixed`.
    #[error("unsupported multipart type: {0}")]
    UnsupportedMultipartType(String),

    /// A body part is not one of the supported text formats.
    #[error("content type not supported: {0}")]
    UnsupportedContentType(String),

    /// Transfer decoding of a body part failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Nested multipart containers exceed the configured depth.
    #[error("multipart nesting exceeds the limit of {limit}")]
    TooDeeplyNested { limit: usize },

    /// The recipient is not served by this inbox domain.
    #[error("recipient domain is not available on this server: {0}")]
    RecipientRejected(String),

    /// The specified message file does not exist.
    #[error("message file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The raw message is larger than the configured limit.
    #[error("message is {size} bytes, limit is {limit}")]
    MessageTooLarge { size: u64, limit: u64 },
}

/// Convenience alias for `Result<T, MailError>`.
pub type Result<T> = std::result::Result<T, MailError>;

impl MailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
