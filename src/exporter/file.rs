//! JSONL file exporter
//!
//! Appends one serialized record per line. Each line is written with a
//! single `write_all` on an append-mode handle. A failed write can leave a
//! truncated trailing line; the next record starts on a fresh line so only
//! the failed record is lost.
//!
//! With `daily: true` the configured path is a directory and records land
//! in `<dir>/YYYY-MM/YYYY-MM-DD.jsonl`, switching files at midnight.

use chrono::{Local, NaiveDate};
use eyre::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Exporter;
use crate::config::{Config, ExporterArgs};
use crate::event::EventRecord;

enum Target {
    Single,
    Daily { dir: PathBuf, day: NaiveDate },
}

pub struct FileExporter {
    path: PathBuf,
    file: File,
    target: Target,
    /// Last write failed part-way; the file may end mid-line
    dirty: bool,
}

impl FileExporter {
    pub fn from_args(args: &ExporterArgs) -> Result<Self> {
        let path = args
            .path
            .as_ref()
            .ok_or_else(|| eyre::eyre!("File exporter requires args.path"))?;
        let path = Config::expand_path(path);

        if args.daily {
            Self::daily(path)
        } else {
            Self::open(path)
        }
    }

    /// Append to a single file, creating it and its parent directories
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file,
            target: Target::Single,
            dirty: false,
        })
    }

    /// Append to a daily file under `dir`
    pub fn daily(dir: PathBuf) -> Result<Self> {
        let today = Local::now().date_naive();
        let path = daily_path(&dir, today);
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file,
            target: Target::Daily { dir, day: today },
            dirty: false,
        })
    }

    fn roll_if_needed(&mut self) -> Result<()> {
        if let Target::Daily { dir, day } = &mut self.target {
            let today = Local::now().date_naive();
            if today != *day {
                let path = daily_path(dir, today);
                self.file = open_append(&path)?;
                self.path = path;
                self.dirty = false;
                *day = today;
            }
        }
        Ok(())
    }
}

fn daily_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(day.format("%Y-%m").to_string())
        .join(format!("{}.jsonl", day.format("%Y-%m-%d")))
}

/// Write one newline-terminated line, first closing off a line left
/// truncated by an earlier failed write
fn append_line<W: Write>(writer: &mut W, dirty: &mut bool, line: &[u8]) -> std::io::Result<()> {
    if *dirty {
        writer.write_all(b"\n")?;
        *dirty = false;
    }
    let result = writer.write_all(line);
    if result.is_err() {
        *dirty = true;
    }
    result
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Failed to create directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open {}", path.display()))
}

impl Exporter for FileExporter {
    fn send(&mut self, record: &EventRecord) -> Result<()> {
        self.roll_if_needed()?;

        let mut line = record.to_json_line().context("Failed to serialize record")?;
        line.push('\n');
        append_line(&mut self.file, &mut self.dirty, line.as_bytes())
            .context(format!("Failed to append to {}", self.path.display()))
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_data().context("Failed to sync event file")
    }
}
