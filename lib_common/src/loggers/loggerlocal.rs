use anyhow::Result;
use chrono::Local;
use colored::*;
use glob::glob;
use log::{Level, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};

/// # Logger Local Options
///
/// Controls where and how log lines are written.
#[derive(Debug, Clone)]
pub struct LoggerLocalOptions {
    /// Prefix of the log file names (`<app_name>_<timestamp>.log`).
    pub app_name: String,
    /// Maximum level written to any sink.
    pub level: LevelFilter,
    /// Print to stdout with a coloured level.
    pub use_tty: bool,
    /// Directory for log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// How many log files (including the new one) survive rotation.
    pub keep_files: usize,
}

impl Default for LoggerLocalOptions {
    fn default() -> Self {
        Self {
            app_name: "eddn_watcher".to_string(),
            level: LevelFilter::Info,
            use_tty: true,
            log_dir: Some(PathBuf::from("./logs")),
            keep_files: 5,
        }
    }
}

/// Installs the global `fern` logger.
///
/// Returns the path of the new log file when file logging is enabled. Can only
/// succeed once per process.
pub fn setup_logging(options: &LoggerLocalOptions) -> Result<Option<PathBuf>> {
    let mut dispatch = fern::Dispatch::new()
        .level(options.level)
        // zeromq is chatty about socket internals at debug level
        .level_for("zeromq", LevelFilter::Warn.min(options.level));

    if options.use_tty {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{}[{}][{}] {}",
                        Local::now().format("[%Y-%m-%d %H:%M:%S]").to_string().truecolor(128, 128, 128),
                        record.target(),
                        colored_level(record.level()),
                        message
                    ))
                })
                .chain(std::io::stdout()),
        );
    }

    let mut log_path = None;
    if let Some(log_dir) = &options.log_dir {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)?;
        }

        // The new file counts towards keep_files.
        rotate_logs(&options.app_name, log_dir, options.keep_files.saturating_sub(1));

        let path = log_dir.join(log_file_name(&options.app_name));
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{}[{}][{}] {}",
                        Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                        record.target(),
                        record.level(),
                        message
                    ))
                })
                .chain(fern::log_file(&path)?),
        );
        log_path = Some(path);
    }

    dispatch.apply()?;
    Ok(log_path)
}

fn colored_level(level: Level) -> ColoredString {
    let name = level.to_string();
    match level {
        Level::Error => name.bright_red(),
        Level::Warn => name.bright_yellow(),
        Level::Info => name.bright_green(),
        Level::Debug => name.bright_white(),
        Level::Trace => name.bright_cyan(),
    }
}

/// `<app_name>_<YYYYmmdd_HHMMSS>.log`. Sorts chronologically by name.
pub fn log_file_name(app_name: &str) -> String {
    format!("{}_{}.log", app_name, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Deletes all but the `keep` newest log files of `app_name` in `log_dir`.
///
/// Files are ordered by name, which embeds the start timestamp. Failures to
/// delete are reported on stderr since the logger is not installed yet.
pub fn rotate_logs(app_name: &str, log_dir: &Path, keep: usize) {
    let pattern = format!("{}/{}_*.log", log_dir.display(), app_name);
    let mut log_files: Vec<PathBuf> = match glob(&pattern) {
        Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
        Err(e) => {
            eprintln!("Invalid log rotation pattern {}: {}", pattern, e);
            return;
        }
    };

    // Newest first.
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    for old_file in log_files.iter().skip(keep) {
        if let Err(e) = fs::remove_file(old_file) {
            eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
        }
    }
}
