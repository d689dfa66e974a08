use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::ReleaseVersion;

/// Release status as stored in a browser's release history.
///
/// A release only ever moves towards `Retired`, so merging two statuses
/// keeps the later stage. `Unknown` stands for a missing or unrecognized
/// stored value and is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Unknown,
    Planned,
    Nightly,
    Beta,
    Current,
    Esr,
    Exclusive,
    Retired,
}

impl Status {
    #[must_use]
    pub fn lifecycle_rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Planned => 1,
            Self::Nightly => 2,
            Self::Beta => 3,
            Self::Current => 4,
            Self::Esr => 5,
            Self::Retired => 6,
            // Set by hand for one-off vendor builds; never ranked against channels.
            Self::Exclusive => u8::MAX,
        }
    }

    /// Statuses that a newer stable release should push into retirement.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Planned | Self::Nightly | Self::Beta | Self::Current | Self::Esr
        )
    }

    /// Merge an observed status into an existing one without moving backwards.
    #[must_use]
    pub fn advance_to(self, observed: Status) -> Status {
        if self == Self::Exclusive || observed.lifecycle_rank() <= self.lifecycle_rank() {
            self
        } else {
            observed
        }
    }

    /// Parse a stored status string. `None` for anything this tool does not
    /// manage, including a literal `"unknown"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "planned" => Some(Self::Planned),
            "nightly" => Some(Self::Nightly),
            "beta" => Some(Self::Beta),
            "current" => Some(Self::Current),
            "esr" => Some(Self::Esr),
            "exclusive" => Some(Self::Exclusive),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Planned => "planned",
            Self::Nightly => "nightly",
            Self::Beta => "beta",
            Self::Current => "current",
            Self::Esr => "esr",
            Self::Exclusive => "exclusive",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized upstream release track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Esr,
    Beta,
    Nightly,
    Planned,
}

impl Channel {
    /// Total order used when one version is reported by several channels:
    /// `stable > esr > beta > nightly > planned`.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Stable => 4,
            Self::Esr => 3,
            Self::Beta => 2,
            Self::Nightly => 1,
            Self::Planned => 0,
        }
    }

    #[must_use]
    pub fn status(self) -> Status {
        match self {
            Self::Stable => Status::Current,
            Self::Esr => Status::Esr,
            Self::Beta => Status::Beta,
            Self::Nightly => Status::Nightly,
            Self::Planned => Status::Planned,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Esr => write!(f, "esr"),
            Self::Beta => write!(f, "beta"),
            Self::Nightly => write!(f, "nightly"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

/// One entry of a browser's `releases` map. The version is the map key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct ReleaseRecord {
    pub release_date: Option<NaiveDate>,
    pub release_notes: Option<String>,
    pub status: Status,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    /// Stored `status` string this tool does not recognize. Written back
    /// as long as `status` stays `Unknown`.
    pub unrecognized_status: Option<String>,
    /// Fields this tool does not manage, kept verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// On-disk shape of a release record.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engine_version: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<StoredRecord> for ReleaseRecord {
    fn from(stored: StoredRecord) -> Self {
        let status = stored.status.as_deref().and_then(Status::from_name);
        Self {
            release_date: stored.release_date,
            release_notes: stored.release_notes,
            status: status.unwrap_or_default(),
            engine: stored.engine,
            engine_version: stored.engine_version,
            unrecognized_status: if status.is_none() { stored.status } else { None },
            extra: stored.extra,
        }
    }
}

impl From<ReleaseRecord> for StoredRecord {
    fn from(record: ReleaseRecord) -> Self {
        let status = if record.status == Status::Unknown {
            record.unrecognized_status
        } else {
            Some(record.status.as_str().to_string())
        };
        Self {
            release_date: record.release_date,
            release_notes: record.release_notes,
            status,
            engine: record.engine,
            engine_version: record.engine_version,
            extra: record.extra,
        }
    }
}

/// A normalized release fact reported by an upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamFact {
    pub version: ReleaseVersion,
    pub release_date: Option<NaiveDate>,
    pub channel: Channel,
    pub release_notes: Option<String>,
    pub platform: Option<String>,
}

impl UpstreamFact {
    #[must_use]
    pub fn new(version: ReleaseVersion, channel: Channel) -> Self {
        Self {
            version,
            release_date: None,
            channel,
            release_notes: None,
            platform: None,
        }
    }

    #[must_use]
    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.release_date = date;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.release_notes = notes;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}
