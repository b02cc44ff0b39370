//! Error types for votecounter
//!
//! This module provides the error taxonomy of the acquisition pipeline:
//! - Locator misuse (invalid jurisdiction, unknown office), which is a caller bug
//! - Unexpected remote document shapes (freshness records, section listings)
//! - Transport failures, isolated to a single machine during bulk runs
//! - Artifact decode failures, fatal for the artifact being decoded
//! - Integrity mismatches between a decoded ballot and the machine that requested it

use crate::types::SectionKey;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for votecounter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for votecounter
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "rate_limit.max_calls")
        key: Option<String>,
    },

    /// Jurisdiction code not accepted by the requested endpoint
    #[error("jurisdiction '{0}' is not valid for this endpoint")]
    InvalidJurisdiction(String),

    /// Office name missing from the results lookup table
    #[error("unknown office: '{0}'")]
    UnknownOffice(String),

    /// Per-machine info document without the expected hash fields
    #[error("malformed freshness record from {url}: {reason}")]
    MalformedFreshnessRecord {
        /// URL the record was fetched from
        url: String,
        /// What was missing or unparseable
        reason: String,
    },

    /// Metadata listing document without the expected structure
    #[error("malformed section listing from {url}: {reason}")]
    Listing {
        /// URL the listing was fetched from
        url: String,
        /// What was missing or unparseable
        reason: String,
    },

    /// Network or download failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Corrupt or schema-mismatched artifact
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The machine has no downloaded artifact to decode
    #[error("no downloaded artifact for section {0}")]
    MissingArtifact(SectionKey),

    /// The machine's cached payload is absent or flagged stale
    #[error("cached ballot for section {0} is stale or missing")]
    StalePayload(SectionKey),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the fetch and bulk download capabilities
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the transport timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Could not establish a connection
    #[error("connection to {url} failed: {reason}")]
    Connect {
        /// Requested URL
        url: String,
        /// Underlying client message
        reason: String,
    },

    /// Any other client-side request failure (invalid URL, body read error, ...)
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client message
        reason: String,
    },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Writing the downloaded body to disk failed
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl TransportError {
    /// Build a transport error from a reqwest failure, keeping the timeout/connect distinction
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

/// Binary artifact decoding errors
///
/// Offsets are absolute byte positions within the buffer being decoded, so the
/// inner ballot layer reports positions relative to the envelope content.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input ended before a complete TLV could be read
    #[error("truncated input at offset {offset}: {needed} more bytes required")]
    Truncated {
        /// Where the truncated element starts
        offset: usize,
        /// Bytes missing
        needed: usize,
    },

    /// A different tag was found where a schema field was expected
    #[error("unexpected tag at offset {offset} while decoding {field}: expected {expected}, found {found}")]
    UnexpectedTag {
        /// Where the tag was read
        offset: usize,
        /// Schema path of the field
        field: &'static str,
        /// Expected tag
        expected: String,
        /// Tag actually present
        found: String,
    },

    /// Length octets that cannot be honoured
    #[error("invalid length encoding at offset {offset}")]
    InvalidLength {
        /// Where the length octets start
        offset: usize,
    },

    /// A required field is absent from a constructed value
    #[error("missing required field {field}")]
    MissingField {
        /// Schema path of the field
        field: &'static str,
    },

    /// Primitive content that does not fit the declared type
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Schema path of the field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Bytes left over after the top-level value
    #[error("{count} trailing bytes after {field}")]
    TrailingData {
        /// Schema type that was decoded
        field: &'static str,
        /// Number of leftover bytes
        count: usize,
    },

    /// The artifact file could not be read
    #[error("failed to read artifact {path}: {source}")]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// A decoded ballot whose embedded section identification does not match the
/// machine it was downloaded for
///
/// Reported as a warning: the decoded data is still usable.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("ballot reports section {found} but was requested for section {expected}")]
pub struct IntegrityMismatch {
    /// Identification of the requesting machine
    pub expected: SectionKey,
    /// Identification embedded in the ballot
    pub found: SectionKey,
}
