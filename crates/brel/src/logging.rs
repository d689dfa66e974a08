use std::fs::OpenOptions;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// `-v` count to log level: warnings by default, then info, debug, trace.
#[must_use]
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Log to stderr and, when `log_file` is given, append to that file too.
///
/// # Errors
/// Returns an error when the log file cannot be opened. Terminal logging
/// is still set up in that case.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>) -> std::io::Result<()> {
    let level = level_for(verbosity);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("brel")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let file = log_file.map(|path| {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    });
    let file_result = match file {
        Some(Ok(file)) => {
            loggers.push(WriteLogger::new(level, config, file));
            Ok(())
        }
        Some(Err(error)) => Err(error),
        None => Ok(()),
    };

    let _ = CombinedLogger::init(loggers);
    file_result
}
