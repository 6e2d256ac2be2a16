use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::producer::PRODUCERS;

/// Main evroute configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Global telemetry gate; when false producers drop everything
    pub telemetry: bool,
    /// Environment tag stamped on records (falls back to EVROUTE_ENV, then "local")
    pub environment: Option<String>,
    /// Machine identifier (defaults to a hash of the host name)
    pub machine_id: Option<String>,
    /// URI schemes treated as real, persisted files
    pub tracked_schemes: Vec<String>,
    #[serde(alias = "activeEvents")]
    pub active_events: Vec<ActiveEventEntry>,
    pub exporters: Vec<ExporterConfig>,
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// One entry of an active-events list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActiveEventEntry {
    pub name: String,
    /// Ship the full content payload for this event kind
    #[serde(default, alias = "logWholeDocument")]
    pub log_whole_document: bool,
}

impl ActiveEventEntry {
    pub fn new(name: impl Into<String>, log_whole_document: bool) -> Self {
        Self {
            name: name.into(),
            log_whole_document,
        }
    }
}

/// Exporter sink type
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// Write records to stdout or stderr
    Console,
    /// Append JSONL records to a local file
    File,
    /// POST records to an HTTP endpoint
    Http,
    /// Anything else; the exporter is disabled at construction
    #[serde(other)]
    Unsupported,
}

impl ExporterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExporterKind::Console => "console",
            ExporterKind::File => "file",
            ExporterKind::Http => "http",
            ExporterKind::Unsupported => "unsupported",
        }
    }
}

/// Console output stream
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

/// Console line format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Colored human-readable line
    Pretty,
}

/// Sink-specific construction arguments
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExporterArgs {
    /// Destination file (file exporter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Treat `path` as a directory of daily `YYYY-MM/YYYY-MM-DD.jsonl` files
    pub daily: bool,
    /// Destination URL (http exporter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request timeout in milliseconds (http exporter)
    #[serde(skip_serializing_if = "Option::is_none", alias = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    /// Extra request headers (http exporter)
    #[serde(skip_serializing_if = "indexmap::IndexMap::is_empty")]
    pub headers: indexmap::IndexMap<String, String>,
    pub stream: ConsoleStream,
    pub format: ConsoleFormat,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExporterConfig {
    #[serde(rename = "type")]
    pub kind: ExporterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub args: ExporterArgs,
    /// Replaces the global active-events list for this exporter
    #[serde(default, alias = "activeEvents", skip_serializing_if = "Option::is_none")]
    pub active_events: Option<Vec<ActiveEventEntry>>,
}

impl ExporterConfig {
    pub fn new(kind: ExporterKind) -> Self {
        Self {
            kind,
            name: None,
            args: ExporterArgs::default(),
            active_events: None,
        }
    }

    /// Human-facing label used in logs: the configured name or `<type>#<index>`
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}#{}", self.kind.as_str(), index))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            telemetry: true,
            environment: None,
            machine_id: None,
            tracked_schemes: vec!["file".to_string()],
            active_events: PRODUCERS
                .iter()
                .map(|p| ActiveEventEntry::new(p.event_name(), false))
                .collect(),
            exporters: vec![ExporterConfig::new(ExporterKind::Console)],
            source: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for (origin, path) in Self::candidates() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {:#}", origin, e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Candidate config files in lookup order
    fn candidates() -> Vec<(String, PathBuf)> {
        let mut candidates = Vec::new();

        if let Ok(env_path) = std::env::var("EVROUTE_CONFIG") {
            candidates.push(("EVROUTE_CONFIG".to_string(), PathBuf::from(env_path)));
        }

        if let Ok(dir) = std::env::var("EVROUTE_DIR") {
            candidates.push(("EVROUTE_DIR".to_string(), PathBuf::from(dir).join("evroute.yaml")));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("evroute").join("evroute.yaml");
            candidates.push((path.display().to_string(), path));
        }

        candidates.push(("./evroute.yaml".to_string(), PathBuf::from("evroute.yaml")));
        candidates
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let mut config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.source = Some(path.as_ref().to_path_buf());

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
