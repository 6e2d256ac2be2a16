//! Event routing
//!
//! The [`Router`] owns the current [`Dispatcher`] snapshot. Publishing
//! reads the snapshot, reloading swaps in a freshly built one; a publish
//! racing with a reload sees either the old routing or the new one, never
//! a mix.

use std::sync::{Arc, PoisonError, RwLock};

use crate::config::Config;
use crate::event::EventRecord;
use crate::exporter::ExporterStats;

pub mod dispatcher;
pub mod resolver;

pub use dispatcher::Dispatcher;
pub use resolver::{ConfigResolver, ExporterId};

/// Delivery target producers publish into
pub trait Publish: Send + Sync {
    fn publish(&self, record: EventRecord);
}

pub struct Router {
    current: RwLock<Arc<Dispatcher>>,
}

impl Router {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            current: RwLock::new(Arc::new(dispatcher)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Dispatcher::from_config(config))
    }

    /// Current routing snapshot
    pub fn snapshot(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the routing with one built from `config`.
    ///
    /// The previous exporters drain their queues and close once the last
    /// in-flight publish using them returns.
    pub fn reload(&self, config: &Config) {
        let next = Arc::new(Dispatcher::from_config(config));
        let previous = self.swap(next);
        log::info!("Routing reloaded ({} exporters)", self.snapshot().exporter_labels().len());
        drop(previous);
    }

    /// Swap in an empty dispatcher, drain every exporter and return the final counts
    pub fn shutdown(&self) -> Vec<ExporterStats> {
        let previous = self.swap(Arc::new(Dispatcher::empty()));
        let stats = previous.stats();
        drop(previous);
        stats.iter().map(|s| s.snapshot()).collect()
    }

    fn swap(&self, next: Arc<Dispatcher>) -> Arc<Dispatcher> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }
}

impl Publish for Router {
    fn publish(&self, record: EventRecord) {
        self.snapshot().publish(record);
    }
}
