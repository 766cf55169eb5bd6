use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, Once};

use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use wr_core::Result;

static INIT: Once = Once::new();

/// Prepends a fixed set of tags to every message, e.g. `[wikipedia] [ru]`.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    prefixes: VecDeque<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            prefixes: VecDeque::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefixes.push_back(prefix);
        self
    }

    fn prefixed(&self, message: &str) -> String {
        let prefix = self.prefixes.iter().map(|p| format!("{} ", p)).collect::<String>();
        format!("{}{}", prefix, message)
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{}", self.prefixed(message));
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{}", self.prefixed(message));
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{}", self.prefixed(message));
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Appends to a file, without colors.
    File(PathBuf),
    /// Drops everything. For full-screen views that own the terminal.
    Discard,
}

impl LogOutput {
    fn make_writer(&self) -> Result<BoxMakeWriter> {
        Ok(match self {
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                BoxMakeWriter::new(Mutex::new(file))
            }
            LogOutput::Discard => BoxMakeWriter::new(std::io::sink),
        })
    }
}

/// Installs the global subscriber once. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: Level, output: &LogOutput) -> Result<Logger> {
    if !tracing::dispatcher::has_been_set() {
        let writer = output.make_writer()?;
        let ansi = *output == LogOutput::Stderr;
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .try_init();
        });
    }
    Ok(Logger::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wr_core::FailureKind;

    #[test]
    fn test_prefixes() {
        let logger = Logger::new()
            .with_prefix("[wikipedia]".to_string())
            .with_prefix("[ru]".to_string());
        assert_eq!(logger.prefixed("fetched"), "[wikipedia] [ru] fetched");
        assert_eq!(Logger::new().prefixed("bare"), "bare");
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Level::WARN, &LogOutput::Discard).unwrap().debug("first");
        init_logging(Level::INFO, &LogOutput::Stderr).unwrap().debug("second");
    }

    #[test]
    fn test_file_output_creates_file() {
        let path = std::env::temp_dir().join(format!("wr-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        LogOutput::File(path.clone()).make_writer().unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let path = std::env::temp_dir().join("wr-missing-dir").join("nested").join("wr.log");
        let err = LogOutput::File(path).make_writer().err().unwrap();
        assert!(matches!(err, wr_core::Error::Io(_)));
        assert_eq!(err.kind(), FailureKind::Other);
    }
}
