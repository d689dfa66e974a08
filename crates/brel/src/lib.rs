//! Command-line front end: selection, settings, persistence and the
//! per-browser pipelines that keep `browser-compat-data` release files
//! in step with upstream.

pub mod cli;
pub mod error;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod selection;
pub mod settings;

pub use error::{PipelineError, SettingsError};
pub use pipeline::{CombinationOutcome, Fetchers, RunOptions, run_all, run_combination};
pub use selection::{Browser, BrowserFilter, DeviceFilter, Selection};
pub use settings::Settings;
