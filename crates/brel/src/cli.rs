use std::path::PathBuf;

use brel_core::{ConflictPolicy, ReconcileOptions};
use clap::{Parser, ValueEnum};

use crate::pipeline::RunOptions;
use crate::selection::{BrowserFilter, DeviceFilter};

/// Update browser release histories in a browser-compat-data checkout
#[derive(Debug, Parser)]
#[command(name = "brel", version, about, after_help = AFTER_HELP)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Update Chrome for Desktop and Chrome for Android
    #[arg(long)]
    pub chrome: bool,

    /// Update WebView for Android
    #[arg(long)]
    pub webview: bool,

    /// Update Edge for Desktop
    #[arg(long)]
    pub edge: bool,

    /// Update Firefox for Desktop and Firefox for Android
    #[arg(long)]
    pub firefox: bool,

    /// Update every browser
    #[arg(long)]
    pub all: bool,

    /// Only desktop browsers
    #[arg(long)]
    pub desktop: bool,

    /// Only mobile browsers
    #[arg(long)]
    pub mobile: bool,

    /// Desktop and mobile browsers
    #[arg(long)]
    pub alldevices: bool,

    /// Root of the browser-compat-data checkout
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub bcd_root: PathBuf,

    /// Fail a browser when conflicts or integrity problems are found
    #[arg(long)]
    pub strict: bool,

    /// What to do when upstream disagrees with a stored value
    #[arg(long, value_enum, default_value_t = ConflictPolicyArg::KeepExisting)]
    pub conflict_policy: ConflictPolicyArg,

    /// Remove stored entries for versions on the skip list
    #[arg(long)]
    pub prune_skipped: bool,

    /// Reconcile and report without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Also write log records to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

const AFTER_HELP: &str = "\
SELECTION:
  Without a browser flag every browser is updated; without a device flag
  every device is. Browser and device flags combine:

    brel --chrome --mobile      # Chrome for Android only
    brel --firefox --dry-run    # Report Firefox changes, write nothing
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicyArg {
    KeepExisting,
    PreferUpstream,
    SkipRecord,
}

impl From<ConflictPolicyArg> for ConflictPolicy {
    fn from(value: ConflictPolicyArg) -> Self {
        match value {
            ConflictPolicyArg::KeepExisting => Self::KeepExisting,
            ConflictPolicyArg::PreferUpstream => Self::PreferUpstream,
            ConflictPolicyArg::SkipRecord => Self::SkipRecord,
        }
    }
}

impl Cli {
    #[must_use]
    pub fn browser_filter(&self) -> BrowserFilter {
        BrowserFilter {
            chrome: self.chrome,
            webview: self.webview,
            edge: self.edge,
            firefox: self.firefox,
            all: self.all,
        }
    }

    #[must_use]
    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter {
            desktop: self.desktop,
            mobile: self.mobile,
            all: self.alldevices,
        }
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            bcd_root: self.bcd_root.clone(),
            reconcile: ReconcileOptions {
                conflict_policy: self.conflict_policy.into(),
                strict: self.strict,
                prune_skipped: self.prune_skipped,
            },
            dry_run: self.dry_run,
        }
    }
}
