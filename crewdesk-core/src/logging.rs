//! Logging setup
//!
//! Structured logging on top of `tracing-subscriber` with configurable output format.

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread: bool,
    /// Log file path; stdout when unset
    pub log_file_path: Option<String>,
    /// Emit a line when request spans close
    pub log_span_close: bool,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_file_path: None,
            log_span_close: false,
            filter_directives: vec![
                "crewdesk_core=info".to_string(),
                "crewdesk_applications=info".to_string(),
                "crewdesk_web=info".to_string(),
                "tower_http=info".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    /// Same config with every crewdesk crate raised to `level`
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        for directive in self.filter_directives.iter_mut() {
            if directive.starts_with("crewdesk") {
                if let Some((target, _)) = directive.split_once('=') {
                    *directive = format!("{}={}", target, level);
                }
            }
        }
        self
    }
}

/// Initialize the global subscriber. `RUST_LOG` wins over `config.level`.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for directive in &config.filter_directives {
        filter = filter.add_directive(directive.parse()?);
    }

    let span_events = if config.log_span_close {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);

    let base = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread);

    match (&config.format, &config.log_file_path) {
        (LogFormat::Json, Some(path)) => {
            let file = open_log_file(path)?;
            registry.with(base.json().with_writer(file)).try_init()?;
        }
        (LogFormat::Json, None) => {
            registry.with(base.json().with_writer(io::stdout)).try_init()?;
        }
        (LogFormat::Pretty, Some(path)) => {
            let file = open_log_file(path)?;
            registry.with(base.pretty().with_writer(file)).try_init()?;
        }
        (LogFormat::Pretty, None) => {
            registry.with(base.pretty().with_writer(io::stdout)).try_init()?;
        }
        (LogFormat::Compact, Some(path)) => {
            let file = open_log_file(path)?;
            registry.with(base.compact().with_writer(file)).try_init()?;
        }
        (LogFormat::Compact, None) => {
            registry.with(base.compact().with_writer(io::stdout)).try_init()?;
        }
    }

    Ok(())
}

fn open_log_file(path: &str) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
