use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    /// `--debug` wins over `-v` counts.
    pub fn from_flags(verbose: u8, debug: bool) -> Self {
        if debug {
            return LogLevel::Debug;
        }
        match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// Writes to stderr until a file is attached; the full-screen UI owns the
/// terminal, so the reader redirects records to a file while it runs.
struct Logger {
    file: Mutex<Option<File>>,
}

static LOGGER: Logger = Logger {
    file: Mutex::new(None),
};

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let label = record.level().as_str().to_lowercase();
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        match file.as_mut() {
            Some(file) => {
                let _ = writeln!(
                    file,
                    "{} [{}] {}: {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    label,
                    record.target(),
                    record.args()
                );
            }
            None => eprintln!("[{}] {}", label, record.args()),
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock()
            && let Some(file) = file.as_mut()
        {
            let _ = file.flush();
        }
    }
}

pub fn init(level: LogLevel) {
    // A second call only adjusts the level.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level.filter());
}

/// Append records to `path` instead of stderr.
pub fn redirect_to_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut slot) = LOGGER.file.lock() {
        *slot = Some(file);
    }
    Ok(())
}

/// Back to stderr, e.g. after the terminal has been restored.
pub fn redirect_to_stderr() {
    log::logger().flush();
    if let Ok(mut slot) = LOGGER.file.lock() {
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(LogLevel::from_flags(0, false), LogLevel::Warn);
        assert_eq!(LogLevel::from_flags(1, false), LogLevel::Info);
        assert_eq!(LogLevel::from_flags(2, false), LogLevel::Debug);
        assert_eq!(LogLevel::from_flags(0, true), LogLevel::Debug);
    }

    #[test]
    fn test_records_go_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("luz.log");
        init(LogLevel::Info);
        redirect_to_file(&path).unwrap();
        log::warn!("note save failed");
        log::debug!("too chatty");
        redirect_to_stderr();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[warn]"));
        assert!(content.contains("note save failed"));
        assert!(!content.contains("too chatty"));
    }
}
