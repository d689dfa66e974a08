use std::fmt;

use thiserror::Error;

use crate::version::{ReleaseVersion, VersionParseError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} failed: {details}")]
    Request { url: String, details: String },

    #[error("{url} answered HTTP {status}{body_snippet}")]
    HttpStatus {
        url: String,
        status: u16,
        body_snippet: String,
    },

    #[error("{url} is rate limiting requests")]
    RateLimited { url: String },

    #[error("Failed to parse response from {url}: {details}")]
    Parse { url: String, details: String },

    #[error("Unexpected response shape from {source_name}: {details}")]
    UnexpectedShape {
        source_name: &'static str,
        details: String,
    },

    #[error("Timed out after {seconds}s waiting for {url}")]
    Timeout { url: String, seconds: u64 },
}

impl FetchError {
    pub fn request_from<E>(url: &str, error: E) -> Self
    where
        E: fmt::Display,
    {
        Self::Request {
            url: url.to_string(),
            details: error.to_string(),
        }
    }

    pub fn parse_from<E>(url: &str, error: E) -> Self
    where
        E: fmt::Display,
    {
        Self::Parse {
            url: url.to_string(),
            details: error.to_string(),
        }
    }

    pub fn unexpected_shape(source_name: &'static str, details: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            source_name,
            details: details.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Release file is not valid JSON: {0}")]
    Json(String),

    #[error("Release file has no `browsers.{browser}` entry")]
    MissingBrowser { browser: String },

    #[error("`browsers.{browser}.releases` is missing or not an object")]
    MissingReleases { browser: String },

    #[error("Release key `{key}` is invalid: {source}")]
    InvalidVersion {
        key: String,
        #[source]
        source: VersionParseError,
    },

    #[error("Release {version} is malformed: {details}")]
    InvalidRecord { version: String, details: String },
}

impl From<serde_json::Error> for SchemaError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Record field the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    ReleaseDate,
    ReleaseNotes,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseDate => write!(f, "release_date"),
            Self::ReleaseNotes => write!(f, "release_notes"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictResolution {
    KeptExisting,
    TookUpstream,
    SkippedRecord,
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeptExisting => write!(f, "kept existing value"),
            Self::TookUpstream => write!(f, "took upstream value"),
            Self::SkippedRecord => write!(f, "left record unchanged"),
        }
    }
}

/// Stored data and upstream disagree on a populated field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Release {version}: {field} is `{existing}` but upstream reports `{upstream}` ({resolution})"
)]
pub struct FieldConflictError {
    pub version: ReleaseVersion,
    pub field: RecordField,
    pub existing: String,
    pub upstream: String,
    pub resolution: ConflictResolution,
}

/// A tracked major with no record and no skip-list entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Release {missing} is missing between {lower} and {upper}; add it or list it as skipped")]
pub struct GapIntegrityError {
    pub missing: u32,
    pub lower: ReleaseVersion,
    pub upper: ReleaseVersion,
}

/// Stored data that violates the tracked range or skip list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    #[error("Release {version} is listed as skipped but has a record")]
    SkippedRecord { version: ReleaseVersion },

    #[error("Release {version} predates the first tracked release {first_release}")]
    BelowFirstRelease {
        version: ReleaseVersion,
        first_release: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{} field conflict(s) in strict mode; first: {}", .0.len(), first_message(.0))]
    Conflicts(Vec<FieldConflictError>),

    #[error("{} integrity issue(s) in strict mode; first: {}", .0.len(), first_message(.0))]
    Integrity(Vec<IntegrityIssue>),
}

fn first_message<T: fmt::Display>(items: &[T]) -> String {
    items.first().map(ToString::to_string).unwrap_or_default()
}
