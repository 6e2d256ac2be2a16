//! Exporter sinks
//!
//! An exporter receives shaped records and delivers them somewhere:
//! - Console - JSON or formatted lines on stdout/stderr
//! - File - appends JSONL records to a local file
//! - Http - POSTs each record to an endpoint
//!
//! Each configured exporter runs behind its own [`ExporterWorker`], so
//! publishing only hands the record over and slow or failing sinks never
//! hold up the caller or each other.

use eyre::{Context, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::config::{ExporterConfig, ExporterKind};
use crate::event::EventRecord;
use crate::routing::ExporterId;

pub mod console;
pub mod file;
pub mod http;
#[cfg(test)]
pub mod testing;

pub use console::ConsoleExporter;
pub use file::FileExporter;
pub use http::HttpExporter;

/// A delivery endpoint
pub trait Exporter: Send {
    /// Deliver one record. Errors are logged by the worker and never retried.
    fn send(&mut self, record: &EventRecord) -> Result<()>;

    /// Flush buffered output before the exporter is dropped
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Construct the sink described by one exporter config entry
pub fn build_exporter(config: &ExporterConfig) -> Result<Box<dyn Exporter>> {
    let exporter: Box<dyn Exporter> = match config.kind {
        ExporterKind::Console => Box::new(ConsoleExporter::from_args(&config.args)),
        ExporterKind::File => Box::new(FileExporter::from_args(&config.args)?),
        ExporterKind::Http => Box::new(HttpExporter::from_args(&config.args)?),
        ExporterKind::Unsupported => eyre::bail!("Unsupported exporter type"),
    };
    Ok(exporter)
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Delivery counts for one exporter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExporterStats {
    pub label: String,
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Shared view of an exporter's counters that stays readable after the worker stops
#[derive(Debug, Clone)]
pub struct StatsHandle {
    label: String,
    counters: Arc<Counters>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> ExporterStats {
        ExporterStats {
            label: self.label.clone(),
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Background thread owning one exporter, fed through a FIFO channel.
///
/// Dropping the worker closes the channel, lets the thread drain whatever
/// was already queued, flushes the exporter and joins the thread.
pub struct ExporterWorker {
    id: ExporterId,
    label: String,
    sender: Option<mpsc::Sender<Arc<EventRecord>>>,
    handle: Option<thread::JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl ExporterWorker {
    pub fn spawn(id: ExporterId, label: impl Into<String>, mut exporter: Box<dyn Exporter>) -> Result<Self> {
        let label = label.into();
        let (sender, receiver) = mpsc::channel::<Arc<EventRecord>>();
        let counters = Arc::new(Counters::default());

        let thread_counters = Arc::clone(&counters);
        let thread_label = label.clone();
        let handle = thread::Builder::new()
            .name(format!("evroute-{}", label))
            .spawn(move || {
                for record in receiver {
                    deliver(exporter.as_mut(), &record, &thread_label, &thread_counters);
                }
                if let Err(e) = exporter.flush() {
                    log::warn!("Exporter {} failed to flush: {:#}", thread_label, e);
                }
                log::debug!("Exporter {} stopped", thread_label);
            })
            .context(format!("Failed to start worker for exporter {}", label))?;

        Ok(Self {
            id,
            label,
            sender: Some(sender),
            handle: Some(handle),
            counters,
        })
    }

    pub fn id(&self) -> ExporterId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue a record for delivery without waiting on the sink
    pub fn hand_off(&self, record: Arc<EventRecord>) {
        let Some(sender) = &self.sender else {
            return;
        };
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        if sender.send(record).is_err() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!("Exporter {} is no longer running, record dropped", self.label);
        }
    }

    pub fn stats(&self) -> StatsHandle {
        StatsHandle {
            label: self.label.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl Drop for ExporterWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is drained
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Exporter {} worker terminated abnormally", self.label);
        }
    }
}

fn deliver(exporter: &mut dyn Exporter, record: &EventRecord, label: &str, counters: &Counters) {
    match panic::catch_unwind(AssertUnwindSafe(|| exporter.send(record))) {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!("Exporter {} failed to deliver {}: {:#}", label, record.event_name, e);
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log::error!("Exporter {} panicked while delivering {}", label, record.event_name);
        }
    }
}
