//! Live file-system capture
//!
//! Watches directories until Ctrl+C, routing fsCreate/fsChange/fsDelete and
//! rename events. When the configuration came from a file, edits to that
//! file reload the routing in place.

use colored::*;
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::config::{Config, ExporterKind};
use crate::pipeline::Pipeline;
use crate::watcher::{self, FsWatcher};

enum Signal {
    Fs(notify::Event),
    ConfigChanged,
    WatchError(notify::Error),
}

pub fn run(paths: Vec<PathBuf>, no_reload: bool, no_telemetry: bool, config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(watch(paths, no_reload, no_telemetry, config))
}

async fn watch(paths: Vec<PathBuf>, no_reload: bool, no_telemetry: bool, config: &Config) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Signal>();

    let pipeline = Pipeline::start(config);
    // Exporter files exist once the pipeline has started; resolve them now
    let mut excluded = own_outputs(config);

    let fs_tx = tx.clone();
    let fs_watcher = FsWatcher::new(&paths, move |result| {
        let signal = match result {
            Ok(event) => Signal::Fs(event),
            Err(e) => Signal::WatchError(e),
        };
        let _ = fs_tx.send(signal);
    })?;

    let config_source = config.source.as_ref().filter(|_| !no_reload).cloned();
    let config_watcher = match &config_source {
        Some(source) => {
            let source = source.canonicalize().context("Failed to resolve config path")?;
            let watched = source.clone();
            let cfg_tx = tx.clone();
            Some(FsWatcher::file(&source, move |result| {
                if let Ok(event) = result
                    && watcher::touches(&event, &watched)
                {
                    let _ = cfg_tx.send(Signal::ConfigChanged);
                }
            })?)
        }
        None => None,
    };
    drop(tx);

    eprintln!("{} Watching {} path(s) (Ctrl+C to stop)...", "👁".blue(), fs_watcher.paths().len());
    if let Some(source) = &config_source {
        eprintln!("  Reloading on changes to {}", source.display().to_string().cyan());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = rx.recv() => match signal {
                Some(Signal::Fs(mut event)) => {
                    event.paths.retain(|p| !is_own_output(p, &excluded));
                    for notification in watcher::translate(&event) {
                        pipeline.deliver(&notification);
                    }
                }
                Some(Signal::ConfigChanged) => {
                    if let Some(source) = &config_source
                        && let Some(reloaded) = reload(&pipeline, source, no_telemetry)
                    {
                        excluded = own_outputs(&reloaded);
                    }
                }
                Some(Signal::WatchError(e)) => {
                    log::warn!("File watcher error: {}", e);
                }
                None => break,
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    log::warn!("Failed to listen for Ctrl+C: {}", e);
                }
                break;
            }
        }
    }

    drop(config_watcher);
    drop(fs_watcher);

    let stats = pipeline.shutdown();
    let delivered: u64 = stats.iter().map(|s| s.delivered).sum();
    eprintln!("{} Stopped ({} records delivered)", "✓".green(), delivered);
    Ok(())
}

/// Re-read the config file and swap routing; a bad file keeps the current routing
fn reload(pipeline: &Pipeline, source: &Path, no_telemetry: bool) -> Option<Config> {
    match Config::load_from_file(source) {
        Ok(config) => {
            pipeline.session().set_telemetry(config.telemetry && !no_telemetry);
            pipeline.reload(&config);
            Some(config)
        }
        Err(e) => {
            log::error!("Keeping current routing, config reload failed: {:#}", e);
            None
        }
    }
}

/// Files (or daily directories) that file exporters write into
fn own_outputs(config: &Config) -> Vec<PathBuf> {
    config
        .exporters
        .iter()
        .filter(|e| e.kind == ExporterKind::File)
        .filter_map(|e| e.args.path.as_deref())
        .map(Config::expand_path)
        .map(|p| p.canonicalize().unwrap_or(p))
        .collect()
}

fn is_own_output(path: &Path, outputs: &[PathBuf]) -> bool {
    outputs.iter().any(|o| path.starts_with(o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExporterConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_own_outputs_are_filtered() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("events.jsonl");
        fs::write(&out, "").unwrap();

        let mut exporter = ExporterConfig::new(ExporterKind::File);
        exporter.args.path = Some(out.clone());
        let config = Config {
            exporters: vec![exporter, ExporterConfig::new(ExporterKind::Console)],
            ..Config::default()
        };

        let outputs = own_outputs(&config);
        assert_eq!(outputs.len(), 1);
        assert!(is_own_output(&out.canonicalize().unwrap(), &outputs));
        assert!(!is_own_output(&dir.path().canonicalize().unwrap().join("src.rs"), &outputs));
    }

    #[test]
    fn test_reload_rejects_broken_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("evroute.yaml");
        fs::write(&source, "exporters: [").unwrap();

        let config = Config {
            exporters: vec![],
            ..Config::default()
        };
        let pipeline = Pipeline::start(&config);
        assert!(reload(&pipeline, &source, false).is_none());
        assert!(pipeline.session().telemetry_enabled());

        fs::write(&source, "telemetry: false\nexporters: []\n").unwrap();
        assert!(reload(&pipeline, &source, false).is_some());
        assert!(!pipeline.session().telemetry_enabled());
        pipeline.shutdown();
    }

    #[test]
    fn test_reload_respects_no_telemetry_flag() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("evroute.yaml");
        fs::write(&source, "telemetry: true\nexporters: []\n").unwrap();

        let config = Config {
            telemetry: false,
            exporters: vec![],
            ..Config::default()
        };
        let pipeline = Pipeline::start(&config);
        assert!(reload(&pipeline, &source, true).is_some());
        assert!(!pipeline.session().telemetry_enabled());
        pipeline.shutdown();
    }

    #[test]
    fn test_reload_tracks_new_exporter_outputs() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("evroute.yaml");
        let first = dir.path().join("first.jsonl");
        let moved = dir.path().join("watched").join("moved.jsonl");

        let mut exporter = ExporterConfig::new(ExporterKind::File);
        exporter.args.path = Some(first.clone());
        let config = Config {
            exporters: vec![exporter],
            ..Config::default()
        };
        let pipeline = Pipeline::start(&config);
        let before = own_outputs(&config);

        fs::write(
            &source,
            format!("exporters:\n  - type: file\n    args:\n      path: {}\n", moved.display()),
        )
        .unwrap();
        let reloaded = reload(&pipeline, &source, false).unwrap();
        let after = own_outputs(&reloaded);

        let moved = moved.canonicalize().unwrap();
        assert!(!is_own_output(&moved, &before));
        assert!(is_own_output(&moved, &after));
        assert!(!is_own_output(&first.canonicalize().unwrap(), &after));
        pipeline.shutdown();
    }
}
