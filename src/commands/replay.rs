//! Replay host notifications from JSON Lines
//!
//! Each non-blank line is one raw notification tagged by `kind`, e.g.
//! `{"kind":"documentSaved","document":{"uri":"file:///a.rs","text":"..."}}`.
//! Malformed lines are logged and skipped.

use colored::*;
use eyre::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use crate::config::Config;
use crate::exporter::ExporterStats;
use crate::host::RawNotification;
use crate::pipeline::Pipeline;

/// Counts for one replay run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub delivered: usize,
    pub skipped: usize,
    /// Distinct resources that received an identity
    pub resources: usize,
}

pub fn run(file: Option<PathBuf>, summary: bool, config: &Config) -> Result<()> {
    let reader: Box<dyn BufRead> = match &file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).context(format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let pipeline = Pipeline::start(config);
    let outcome = replay(reader, &pipeline);
    let stats = pipeline.shutdown();

    log::info!(
        "Replayed {} notifications ({} skipped, {} resources)",
        outcome.delivered,
        outcome.skipped,
        outcome.resources
    );

    if summary {
        print_summary(&outcome, &stats);
    }

    Ok(())
}

/// Feed every line of `reader` into the pipeline
pub fn replay<R: BufRead>(reader: R, pipeline: &Pipeline) -> ReplayOutcome {
    let mut outcome = ReplayOutcome::default();

    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read notification stream: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Some(Ok(notification)) => {
                pipeline.deliver(&notification);
                outcome.delivered += 1;
            }
            Some(Err(e)) => {
                log::warn!("Skipping line {}: {}", index + 1, e);
                outcome.skipped += 1;
            }
            None => {}
        }
    }

    outcome.resources = pipeline.registry().resource_count();
    outcome
}

fn parse_line(line: &str) -> Option<serde_json::Result<RawNotification>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

fn print_summary(outcome: &ReplayOutcome, stats: &[ExporterStats]) {
    eprintln!(
        "{} {} notifications replayed, {} skipped, {} distinct resources",
        "✓".green(),
        outcome.delivered,
        outcome.skipped,
        outcome.resources
    );

    if stats.is_empty() {
        eprintln!("  {}", "No exporters enabled".yellow());
        return;
    }

    for s in stats {
        let failed = if s.failed > 0 {
            format!("{} failed", s.failed).red().to_string()
        } else {
            "0 failed".dimmed().to_string()
        };
        eprintln!("  {:<20} {} delivered, {}", s.label.cyan(), s.delivered, failed);
    }
}
