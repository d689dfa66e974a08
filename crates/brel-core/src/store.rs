use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConflictResolution, FieldConflictError, RecordField, SchemaError};
use crate::types::ReleaseRecord;
use crate::version::{ReleaseVersion, VersionScheme};

/// What to do when stored data and upstream disagree on a populated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    #[default]
    KeepExisting,
    PreferUpstream,
    SkipRecord,
}

impl ConflictPolicy {
    fn resolution(self) -> ConflictResolution {
        match self {
            Self::KeepExisting => ConflictResolution::KeptExisting,
            Self::PreferUpstream => ConflictResolution::TookUpstream,
            Self::SkipRecord => ConflictResolution::SkippedRecord,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepExisting => write!(f, "keep-existing"),
            Self::PreferUpstream => write!(f, "prefer-upstream"),
            Self::SkipRecord => write!(f, "skip-record"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub change: Change,
    pub conflicts: Vec<FieldConflictError>,
}

/// One browser's release history, plus the rest of its data file.
///
/// The surrounding document is kept so that fields outside `releases` are
/// written back exactly as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseStore {
    browser: String,
    scheme: VersionScheme,
    document: Value,
    releases: BTreeMap<ReleaseVersion, ReleaseRecord>,
}

impl ReleaseStore {
    /// Parse a browser data file.
    ///
    /// # Errors
    /// Returns a [`SchemaError`] when the document is not JSON, has no
    /// `browsers.<browser>.releases` object, or contains a release key or
    /// record that cannot be read.
    pub fn load(raw: &str, browser: &str, scheme: VersionScheme) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(raw)?;

        let entry = document
            .get("browsers")
            .and_then(|browsers| browsers.get(browser))
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::MissingBrowser {
                browser: browser.to_string(),
            })?;
        let raw_releases = entry
            .get("releases")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::MissingReleases {
                browser: browser.to_string(),
            })?;

        let mut releases = BTreeMap::new();
        for (key, value) in raw_releases {
            let version = ReleaseVersion::parse_with(key, scheme).map_err(|source| {
                SchemaError::InvalidVersion {
                    key: key.clone(),
                    source,
                }
            })?;
            let record: ReleaseRecord =
                serde_json::from_value(value.clone()).map_err(|e| SchemaError::InvalidRecord {
                    version: key.clone(),
                    details: e.to_string(),
                })?;
            if releases.insert(version, record).is_some() {
                return Err(SchemaError::InvalidRecord {
                    version: key.clone(),
                    details: "duplicate release version".to_string(),
                });
            }
        }

        Ok(Self {
            browser: browser.to_string(),
            scheme,
            document,
            releases,
        })
    }

    /// Build a store with a minimal document around `records`.
    #[must_use]
    pub fn from_records(
        browser: &str,
        scheme: VersionScheme,
        records: impl IntoIterator<Item = (ReleaseVersion, ReleaseRecord)>,
    ) -> Self {
        let mut browsers = Map::new();
        browsers.insert(
            browser.to_string(),
            serde_json::json!({ "releases": {} }),
        );
        let mut document = Map::new();
        document.insert("browsers".to_string(), Value::Object(browsers));

        Self {
            browser: browser.to_string(),
            scheme,
            document: Value::Object(document),
            releases: records.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn browser(&self) -> &str {
        &self.browser
    }

    #[must_use]
    pub fn scheme(&self) -> VersionScheme {
        self.scheme
    }

    #[must_use]
    pub fn get(&self, version: &ReleaseVersion) -> Option<&ReleaseRecord> {
        self.releases.get(version)
    }

    #[must_use]
    pub fn contains(&self, version: &ReleaseVersion) -> bool {
        self.releases.contains_key(version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Records in ascending version order.
    pub fn ordered_records(&self) -> impl Iterator<Item = (&ReleaseVersion, &ReleaseRecord)> {
        self.releases.iter()
    }

    /// Merge `incoming` into the record for `version`, inserting it if absent.
    ///
    /// Empty incoming fields never clear stored ones, and a populated field
    /// is only replaced when `policy` says so; every disagreement is
    /// returned as a conflict. Status only ever advances along the release
    /// lifecycle.
    pub fn upsert(
        &mut self,
        version: ReleaseVersion,
        incoming: ReleaseRecord,
        policy: ConflictPolicy,
    ) -> UpsertOutcome {
        let Some(existing) = self.releases.get(&version) else {
            self.releases.insert(version, incoming);
            return UpsertOutcome {
                change: Change::Inserted,
                conflicts: Vec::new(),
            };
        };

        let mut merged = existing.clone();
        let mut conflicts = Vec::new();

        merge_field(
            &mut merged.release_date,
            incoming.release_date,
            RecordField::ReleaseDate,
            &version,
            policy,
            &mut conflicts,
        );
        merge_field(
            &mut merged.release_notes,
            incoming.release_notes,
            RecordField::ReleaseNotes,
            &version,
            policy,
            &mut conflicts,
        );

        // Engine identity is fixed per browser; only fill what is missing.
        if merged.engine.is_none() {
            merged.engine = incoming.engine;
        }
        if merged.engine_version.is_none() {
            merged.engine_version = incoming.engine_version;
        }
        for (key, value) in incoming.extra {
            merged.extra.entry(key).or_insert(value);
        }

        merged.status = merged.status.advance_to(incoming.status);

        if policy == ConflictPolicy::SkipRecord && !conflicts.is_empty() {
            return UpsertOutcome {
                change: Change::Unchanged,
                conflicts,
            };
        }

        let change = if merged == *existing {
            Change::Unchanged
        } else {
            self.releases.insert(version, merged);
            Change::Updated
        };

        UpsertOutcome { change, conflicts }
    }

    /// Drop a record. Only used to correct data after the skip list grows.
    pub fn remove(&mut self, version: &ReleaseVersion) -> Option<ReleaseRecord> {
        self.releases.remove(version)
    }

    /// Render the full document with releases in ascending version order.
    ///
    /// # Errors
    /// Returns an error if a record cannot be converted to JSON.
    pub fn serialize(&self) -> Result<String, SchemaError> {
        let mut releases = Map::new();
        for (version, record) in &self.releases {
            releases.insert(version.to_string(), serde_json::to_value(record)?);
        }

        let mut document = self.document.clone();
        let entry = document
            .get_mut("browsers")
            .and_then(|browsers| browsers.get_mut(&self.browser))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SchemaError::MissingBrowser {
                browser: self.browser.clone(),
            })?;
        entry.insert("releases".to_string(), Value::Object(releases));

        let mut out = serde_json::to_string_pretty(&document)?;
        out.push('\n');
        Ok(out)
    }
}

fn merge_field<T>(
    slot: &mut Option<T>,
    incoming: Option<T>,
    field: RecordField,
    version: &ReleaseVersion,
    policy: ConflictPolicy,
    conflicts: &mut Vec<FieldConflictError>,
) where
    T: PartialEq + ToString,
{
    let Some(incoming) = incoming else {
        return;
    };

    match slot.as_ref() {
        None => *slot = Some(incoming),
        Some(current) if *current == incoming => {}
        Some(current) => {
            conflicts.push(FieldConflictError {
                version: version.clone(),
                field,
                existing: current.to_string(),
                upstream: incoming.to_string(),
                resolution: policy.resolution(),
            });
            if policy == ConflictPolicy::PreferUpstream {
                *slot = Some(incoming);
            }
        }
    }
}
