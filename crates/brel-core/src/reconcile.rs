//! Merges upstream release facts into a stored release history.
//!
//! The engine never mutates the caller's store: it works on a copy and
//! hands back the result together with a report, so a run that fails in
//! strict mode leaves nothing half-applied.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, warn};

use crate::config::BrowserConfig;
use crate::error::{FieldConflictError, GapIntegrityError, IntegrityIssue, ReconcileError};
use crate::store::{Change, ConflictPolicy, ReleaseStore};
use crate::types::{Channel, ReleaseRecord, Status, UpstreamFact};
use crate::version::{ReleaseVersion, VersionScheme};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub conflict_policy: ConflictPolicy,
    /// Fail instead of warning on field conflicts and integrity issues.
    pub strict: bool,
    /// Remove stored records whose version is on the skip list.
    pub prune_skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<ReleaseVersion>,
    pub updated: Vec<ReleaseVersion>,
    pub removed: Vec<ReleaseVersion>,
    pub ignored: usize,
    pub conflicts: Vec<FieldConflictError>,
    pub gaps: Vec<GapIntegrityError>,
    pub integrity: Vec<IntegrityIssue>,
}

impl ReconcileReport {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} added, {} updated, {} removed, {} ignored",
            self.added.len(),
            self.updated.len(),
            self.removed.len(),
            self.ignored
        );
        if !self.conflicts.is_empty() {
            summary.push_str(&format!(", {} conflict(s)", self.conflicts.len()));
        }
        if !self.gaps.is_empty() {
            summary.push_str(&format!(", {} gap(s)", self.gaps.len()));
        }
        summary
    }

    /// Every non-fatal problem, one human-readable line each.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.conflicts
            .iter()
            .map(ToString::to_string)
            .chain(self.gaps.iter().map(ToString::to_string))
            .chain(self.integrity.iter().map(ToString::to_string))
            .collect()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub store: ReleaseStore,
    pub report: ReconcileReport,
}

/// Everything upstream said about one version, collapsed into one view.
#[derive(Debug)]
struct Observation {
    status: Status,
    release_date: Option<chrono::NaiveDate>,
    release_notes: Option<String>,
    channels: BTreeSet<Channel>,
}

impl Observation {
    fn from_facts(mut facts: Vec<UpstreamFact>) -> Self {
        // Highest-priority channel first; ties broken on content so that
        // input order never leaks into the result.
        facts.sort_by(|a, b| {
            b.channel
                .priority()
                .cmp(&a.channel.priority())
                .then_with(|| a.release_date.cmp(&b.release_date))
                .then_with(|| a.release_notes.cmp(&b.release_notes))
        });

        let status = facts
            .first()
            .map_or(Status::Unknown, |fact| fact.channel.status());
        let release_date = facts.iter().find_map(|fact| fact.release_date);
        let release_notes = facts.iter().find_map(|fact| fact.release_notes.clone());
        let channels = facts.iter().map(|fact| fact.channel).collect();

        Self {
            status,
            release_date,
            release_notes,
            channels,
        }
    }
}

pub struct Reconciler<'a> {
    config: &'a BrowserConfig,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(config: &'a BrowserConfig, options: ReconcileOptions) -> Self {
        Self { config, options }
    }

    /// Merge `facts` into a copy of `store`.
    ///
    /// # Errors
    /// In strict mode, returns [`ReconcileError`] when any field conflict or
    /// stored integrity issue was found. Outside strict mode the same
    /// problems are only listed in the report.
    pub fn reconcile(
        &self,
        store: &ReleaseStore,
        facts: Vec<UpstreamFact>,
    ) -> Result<Reconciliation, ReconcileError> {
        let mut store = store.clone();
        let mut report = ReconcileReport::default();

        let observations = self.observe(facts, store.scheme(), &mut report);
        let mut touched: BTreeMap<ReleaseVersion, Change> = BTreeMap::new();

        for (version, observation) in &observations {
            let incoming = self.incoming_record(version, observation, store.contains(version));
            let outcome = store.upsert(version.clone(), incoming, self.options.conflict_policy);
            note_change(&mut touched, version, outcome.change);
            for conflict in outcome.conflicts {
                warn!("{}: {conflict}", self.config.id);
                report.conflicts.push(conflict);
            }
        }

        self.sweep_retired(&mut store, &observations, &mut touched);
        self.check_stored(&mut store, &mut report);

        for (version, change) in touched {
            match change {
                Change::Inserted => report.added.push(version),
                Change::Updated => report.updated.push(version),
                Change::Unchanged => {}
            }
        }
        report.gaps = self.find_gaps(&store);
        for gap in &report.gaps {
            warn!("{}: {gap}", self.config.id);
        }

        debug!(
            "{}: {} conflict(s), {} gap(s), {} integrity issue(s)",
            self.config.id,
            report.conflicts.len(),
            report.gaps.len(),
            report.integrity.len()
        );

        if self.options.strict {
            if !report.conflicts.is_empty() {
                return Err(ReconcileError::Conflicts(report.conflicts));
            }
            if !report.integrity.is_empty() {
                return Err(ReconcileError::Integrity(report.integrity));
            }
        }

        Ok(Reconciliation { store, report })
    }

    fn observe(
        &self,
        facts: Vec<UpstreamFact>,
        scheme: VersionScheme,
        report: &mut ReconcileReport,
    ) -> BTreeMap<ReleaseVersion, Observation> {
        let mut grouped: BTreeMap<ReleaseVersion, Vec<UpstreamFact>> = BTreeMap::new();

        for fact in facts {
            if scheme == VersionScheme::Integer && fact.version.components().len() != 1 {
                warn!(
                    "{}: ignoring {} fact for non-integer version {}",
                    self.config.id, fact.channel, fact.version
                );
                report.ignored += 1;
                continue;
            }
            if !self.config.tracks(&fact.version) {
                debug!(
                    "{}: ignoring untracked version {} ({})",
                    self.config.id, fact.version, fact.channel
                );
                report.ignored += 1;
                continue;
            }
            grouped.entry(fact.version.clone()).or_default().push(fact);
        }

        grouped
            .into_iter()
            .map(|(version, facts)| (version, Observation::from_facts(facts)))
            .collect()
    }

    fn incoming_record(
        &self,
        version: &ReleaseVersion,
        observation: &Observation,
        exists: bool,
    ) -> ReleaseRecord {
        let mut record = ReleaseRecord {
            release_date: observation.release_date,
            release_notes: observation.release_notes.clone(),
            status: observation.status,
            ..ReleaseRecord::default()
        };
        if !exists {
            record.engine = Some(self.config.engine.to_string());
            record.engine_version = Some(version.to_string());
        }
        record
    }

    /// Anything older than the newest stable release is no longer live,
    /// except the release currently served on the ESR channel.
    fn sweep_retired(
        &self,
        store: &mut ReleaseStore,
        observations: &BTreeMap<ReleaseVersion, Observation>,
        touched: &mut BTreeMap<ReleaseVersion, Change>,
    ) {
        let Some(newest_stable) = observations
            .iter()
            .rev()
            .find(|(_, observation)| observation.channels.contains(&Channel::Stable))
            .map(|(version, _)| version.clone())
        else {
            return;
        };

        let candidates: Vec<(ReleaseVersion, Status)> = store
            .ordered_records()
            .take_while(|(version, _)| **version < newest_stable)
            .filter(|(version, _)| self.config.tracks(version))
            .filter_map(|(version, record)| {
                let on_esr = observations
                    .get(version)
                    .is_some_and(|observation| observation.channels.contains(&Channel::Esr));
                let target = if on_esr {
                    Status::Esr
                } else if record.status.is_live() {
                    Status::Retired
                } else {
                    return None;
                };
                (record.status.advance_to(target) != record.status)
                    .then(|| (version.clone(), target))
            })
            .collect();

        for (version, status) in candidates {
            debug!("{}: {version} moves to {status}", self.config.id);
            let outcome = store.upsert(
                version.clone(),
                ReleaseRecord {
                    status,
                    ..ReleaseRecord::default()
                },
                self.options.conflict_policy,
            );
            note_change(touched, &version, outcome.change);
        }
    }

    fn check_stored(&self, store: &mut ReleaseStore, report: &mut ReconcileReport) {
        let mut skipped = Vec::new();
        for (version, _) in store.ordered_records() {
            if self.config.is_skipped(version) {
                skipped.push(version.clone());
            } else if self.config.is_below_first(version) {
                report.integrity.push(IntegrityIssue::BelowFirstRelease {
                    version: version.clone(),
                    first_release: self.config.first_release,
                });
            }
        }

        for version in skipped {
            if self.options.prune_skipped {
                warn!("{}: removing record for skipped release {version}", self.config.id);
                store.remove(&version);
                report.removed.push(version);
            } else {
                report
                    .integrity
                    .push(IntegrityIssue::SkippedRecord { version });
            }
        }
    }

    fn find_gaps(&self, store: &ReleaseStore) -> Vec<GapIntegrityError> {
        let present: BTreeSet<u32> = store
            .ordered_records()
            .map(|(version, _)| version)
            .filter(|version| !self.config.is_below_first(version))
            .map(ReleaseVersion::major)
            .collect();

        let (Some(&lowest), Some(&highest)) = (present.first(), present.last()) else {
            return Vec::new();
        };

        let mut gaps = Vec::new();
        let mut previous = lowest;
        for major in lowest..=highest {
            if present.contains(&major) {
                previous = major;
                continue;
            }
            if self.config.skipped_releases.contains(&major) {
                continue;
            }
            let next = present.range(major..).next().copied().unwrap_or(highest);
            gaps.push(GapIntegrityError {
                missing: major,
                lower: ReleaseVersion::from_major(previous),
                upper: ReleaseVersion::from_major(next),
            });
        }
        gaps
    }
}

/// Keep the strongest change seen for a version across merge and sweep.
fn note_change(
    touched: &mut BTreeMap<ReleaseVersion, Change>,
    version: &ReleaseVersion,
    change: Change,
) {
    let entry = touched.entry(version.clone()).or_insert(Change::Unchanged);
    match (*entry, change) {
        (Change::Inserted, _) | (_, Change::Unchanged) => {}
        (_, change) => *entry = change,
    }
}
