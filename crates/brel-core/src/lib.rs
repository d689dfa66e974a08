//! Release history model and reconciliation engine.
//!
//! This crate holds everything that does not depend on a particular vendor:
//! - The release store read from and written back to a browser data file.
//! - The reconciliation engine that merges upstream facts into a store.
//! - Per-browser configuration presets.
//! - The fetcher trait and the shared HTTP helpers fetchers build on.

mod config;
mod error;
pub mod http;
mod reconcile;
mod store;
mod traits;
mod types;
mod version;

pub use config::{BrowserConfig, ChannelNames, Device, Endpoints, VendorFamily};
pub use error::{
    ConflictResolution, FetchError, FieldConflictError, GapIntegrityError, IntegrityIssue,
    RecordField, ReconcileError, SchemaError,
};
pub use http::FetchSettings;
pub use reconcile::{ReconcileOptions, ReconcileReport, Reconciler, Reconciliation};
pub use store::{Change, ConflictPolicy, ReleaseStore, UpsertOutcome};
pub use traits::ReleaseFetcher;
pub use types::{Channel, ReleaseRecord, Status, UpstreamFact};
pub use version::{ReleaseVersion, VersionParseError, VersionScheme};
