use std::process::ExitCode;

use brel::cli::Cli;
use brel::logging::init_logging;
use brel::{Fetchers, Selection, Settings, run_all};
use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Could not open log file: {error}");
    }

    let settings = match Settings::load(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{err}");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let client = match settings.http_client() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let selection = Selection::from_filters(cli.browser_filter(), cli.device_filter())
        .with_extra_skips(&settings.skipped_releases);
    info!("Updating {} browser(s)", selection.len());

    let fetchers = Fetchers::new(&client, &settings.fetch_settings());
    let outcomes = run_all(selection, &fetchers, &cli.run_options()).await;

    let mut failed = false;
    for outcome in &outcomes {
        println!("{}", outcome.render());
        failed |= !outcome.is_success();
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
