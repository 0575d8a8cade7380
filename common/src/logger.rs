use log::LevelFilter;
use redox_log::{OutputBuilder, RedoxLogger};

/// Scheme category and subcategory used for log files on Redox.
#[cfg(target_os = "redox")]
const LOG_CATEGORY: (&str, &str) = ("misc", "pcie");

pub fn output_level() -> LevelFilter {
    LevelFilter::Info
}

pub fn file_level() -> LevelFilter {
    LevelFilter::Debug
}

/// Maps the number of `-v` flags onto a level, starting at `base`.
///
/// A single flag never lowers a base that is already above `Debug`.
pub fn level_from_verbosity(base: LevelFilter, verbose: u64) -> LevelFilter {
    let raised = match verbose {
        0 => return base,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    raised.max(base)
}

/// Installs the global logger for `tool`.
///
/// Stdout is reserved for reports, so the only console output is stderr. On Redox a
/// `<tool>.log` file is written as well, filtered by `file_level`.
pub fn setup_logging(tool: &str, output_level: LevelFilter, file_level: LevelFilter) {
    let stderr = OutputBuilder::stderr()
        .with_filter(output_level)
        .with_ansi_escape_codes()
        .flush_on_newline(true)
        .build();
    let logger = with_log_file(RedoxLogger::new().with_output(stderr), tool, file_level);

    if let Err(error) = logger.enable() {
        eprintln!("{tool}: failed to install logger: {:?}", error);
    }
}

#[cfg(target_os = "redox")]
fn with_log_file(logger: RedoxLogger, tool: &str, level: LevelFilter) -> RedoxLogger {
    let (category, subcategory) = LOG_CATEGORY;
    match OutputBuilder::in_redox_logging_scheme(category, subcategory, format!("{tool}.log")) {
        Ok(file) => logger.with_output(file.with_filter(level).flush_on_newline(true).build()),
        Err(error) => {
            eprintln!("{tool}: failed to create log file: {}", error);
            logger
        }
    }
}

#[cfg(not(target_os = "redox"))]
fn with_log_file(logger: RedoxLogger, _tool: &str, _level: LevelFilter) -> RedoxLogger {
    logger
}
