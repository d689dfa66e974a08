use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use brel_chromium::ChromiumFetcher;
use brel_core::{
    BrowserConfig, FetchSettings, ReconcileOptions, ReconcileReport, Reconciler, ReleaseFetcher,
    VendorFamily,
};
use brel_edge::EdgeFetcher;
use brel_firefox::FirefoxFetcher;
use futures_util::future::join_all;
use log::{debug, info};

use crate::error::PipelineError;
use crate::persist::{load_store, save_store};
use crate::selection::Selection;

/// One fetcher per vendor family.
#[derive(Clone)]
pub struct Fetchers {
    chromium: Arc<dyn ReleaseFetcher>,
    edge: Arc<dyn ReleaseFetcher>,
    firefox: Arc<dyn ReleaseFetcher>,
}

impl Fetchers {
    #[must_use]
    pub fn new(client: &reqwest::Client, settings: &FetchSettings) -> Self {
        Self {
            chromium: Arc::new(ChromiumFetcher::new(client.clone(), settings.clone())),
            edge: Arc::new(EdgeFetcher::new(client.clone(), settings.clone())),
            firefox: Arc::new(FirefoxFetcher::new(client.clone(), settings.clone())),
        }
    }

    #[must_use]
    pub fn from_parts(
        chromium: Arc<dyn ReleaseFetcher>,
        edge: Arc<dyn ReleaseFetcher>,
        firefox: Arc<dyn ReleaseFetcher>,
    ) -> Self {
        Self {
            chromium,
            edge,
            firefox,
        }
    }

    #[must_use]
    pub fn for_family(&self, family: VendorFamily) -> &dyn ReleaseFetcher {
        match family {
            VendorFamily::Chromium => self.chromium.as_ref(),
            VendorFamily::Edge => self.edge.as_ref(),
            VendorFamily::Firefox => self.firefox.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Root of the browser-compat-data checkout.
    pub bcd_root: PathBuf,
    pub reconcile: ReconcileOptions,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            bcd_root: PathBuf::from("."),
            reconcile: ReconcileOptions::default(),
            dry_run: false,
        }
    }
}

/// Result of updating one browser/device pair.
#[derive(Debug)]
pub struct CombinationOutcome {
    pub id: &'static str,
    pub title: &'static str,
    pub result: Result<ReconcileReport, PipelineError>,
}

impl CombinationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Section printed for this pair: header, summary, then warnings.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("### Updates for {}\n", self.title);
        match &self.result {
            Ok(report) => {
                let _ = writeln!(out, "{}", report.summary());
                for warning in report.warnings() {
                    let _ = writeln!(out, "- {warning}");
                }
            }
            Err(error) => {
                let _ = writeln!(out, "Failed: {error}");
            }
        }
        out
    }
}

/// Load, fetch, reconcile and persist one browser/device pair.
///
/// Nothing is written unless reconciliation succeeds with changes and
/// `dry_run` is off.
///
/// # Errors
/// Returns the first failing stage's error. The release file is untouched
/// in that case.
pub async fn run_combination(
    config: &BrowserConfig,
    fetcher: &dyn ReleaseFetcher,
    options: &RunOptions,
) -> Result<ReconcileReport, PipelineError> {
    let path = options.bcd_root.join(&config.bcd_file);
    let store = load_store(&path, config).await?;
    debug!("{}: loaded {} release(s) from {}", config.id, store.len(), path.display());

    let facts = fetcher.fetch(config).await?;
    debug!("{}: {} fact(s) from {}", config.id, facts.len(), fetcher.name());

    let reconciliation = Reconciler::new(config, options.reconcile).reconcile(&store, facts)?;
    let report = reconciliation.report;

    if !report.has_changes() {
        info!("{}: already up to date", config.id);
    } else if options.dry_run {
        info!("{}: dry run, not writing {}", config.id, path.display());
    } else {
        save_store(&path, &reconciliation.store).await?;
        info!("{}: wrote {}", config.id, path.display());
    }

    Ok(report)
}

/// Run every selected pair concurrently. Outcomes keep selection order.
pub async fn run_all(
    selection: Selection,
    fetchers: &Fetchers,
    options: &RunOptions,
) -> Vec<CombinationOutcome> {
    let runs = selection.into_iter().map(|config| async move {
        let fetcher = fetchers.for_family(config.family);
        let result = run_combination(&config, fetcher, options).await;
        CombinationOutcome {
            id: config.id,
            title: config.title,
            result,
        }
    });
    join_all(runs).await
}

#[cfg(test)]
mod tests {
    use brel_core::{FetchError, ReleaseVersion};

    use super::*;

    #[test]
    fn render_lists_summary_and_warnings() {
        let outcome = CombinationOutcome {
            id: "chrome_desktop",
            title: "Chrome for Desktop",
            result: Ok(ReconcileReport {
                added: vec![ReleaseVersion::from_major(125)],
                ..ReconcileReport::default()
            }),
        };

        assert_eq!(
            outcome.render(),
            "### Updates for Chrome for Desktop\n1 added, 0 updated, 0 removed, 0 ignored\n"
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn render_reports_failure() {
        let outcome = CombinationOutcome {
            id: "edge_desktop",
            title: "Edge for Desktop",
            result: Err(PipelineError::Fetch(FetchError::RateLimited {
                url: "https://edgeupdates.test".to_string(),
            })),
        };

        let rendered = outcome.render();
        assert!(rendered.starts_with("### Updates for Edge for Desktop\nFailed: "));
        assert!(rendered.contains("rate limiting"));
        assert!(!outcome.is_success());
    }
}
