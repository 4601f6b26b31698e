use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

/// Where log output goes. The editor owns the terminal, so it only writes
/// to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    FileOnly,
    ConsoleAndFile,
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "E",
        log::Level::Warn => "W",
        log::Level::Info => "I",
        log::Level::Debug => "D",
        log::Level::Trace => "T",
    }
}

fn console_formatter(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    let color = match record.level() {
        log::Level::Error => "\x1B[31m",
        log::Level::Warn => "\x1B[33m",
        log::Level::Info => "\x1B[32m",
        log::Level::Debug => "\x1B[0m",
        log::Level::Trace => "\x1B[35m",
    };

    out.finish(format_args!(
        "{}{} [{}] {}\x1B[0m",
        color,
        chrono::Local::now().format("%H:%M:%S%.3f"),
        level_tag(record.level()),
        message,
    ))
}

fn file_formatter(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    out.finish(format_args!(
        "{} [{}] {}:{} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level_tag(record.level()),
        record.target(),
        record.line().unwrap_or(0),
        message,
    ))
}

pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::config_dir)
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("draftpad").join("draftpad.log"))
}

/// Installs the global logger. Only the crate's own records pass below `Info`.
pub fn setup_logger(level: log::LevelFilter, target: LogTarget, log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let own_crate = |record: &log::Metadata| {
        record.target().starts_with("draftpad") || record.level() <= log::Level::Info
    };

    let mut dispatch = fern::Dispatch::new().level(level).chain(
        fern::Dispatch::new()
            .filter(own_crate)
            .format(file_formatter)
            .chain(fern::log_file(log_path)?),
    );

    if target == LogTarget::ConsoleAndFile {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .filter(own_crate)
                .format(console_formatter)
                .chain(std::io::stderr()),
        );
    }

    dispatch.apply()?;
    log::debug!("Logger initialized, writing to {:?}", log_path);
    Ok(())
}
