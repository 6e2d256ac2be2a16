//! Record fan-out
//!
//! The dispatcher is the single chokepoint producers publish through. For
//! each record it asks the resolver which exporters want the kind, strips
//! the content where the exporter's list says so, and hands one copy to
//! each eligible exporter's worker.

use std::sync::Arc;

use super::resolver::ConfigResolver;
use crate::config::Config;
use crate::event::EventRecord;
use crate::exporter::{self, ExporterWorker, StatsHandle};

pub struct Dispatcher {
    resolver: ConfigResolver,
    workers: Vec<ExporterWorker>,
}

impl Dispatcher {
    pub fn new(resolver: ConfigResolver, workers: Vec<ExporterWorker>) -> Self {
        Self { resolver, workers }
    }

    /// A dispatcher with no exporters; every publish is a no-op
    pub fn empty() -> Self {
        Self::new(ConfigResolver::default(), Vec::new())
    }

    /// Build every configured exporter. An exporter that fails to construct
    /// is logged and left out; the others run normally.
    pub fn from_config(config: &Config) -> Self {
        let resolver = ConfigResolver::from_config(config);
        let mut workers = Vec::with_capacity(config.exporters.len());

        for (id, exporter_config) in config.exporters.iter().enumerate() {
            let label = exporter_config.label(id);
            let worker = exporter::build_exporter(exporter_config)
                .and_then(|sink| ExporterWorker::spawn(id, label.clone(), sink));

            match worker {
                Ok(worker) => {
                    if resolver.applicable(id).is_empty() {
                        log::warn!("Exporter {} has an empty active-events list and will receive nothing", label);
                    }
                    log::info!(
                        "Exporter {} ready ({} event kinds{})",
                        label,
                        resolver.applicable(id).len(),
                        if resolver.has_override(id) { ", own list" } else { "" }
                    );
                    workers.push(worker);
                }
                Err(e) => {
                    log::error!("Exporter {} disabled for this session: {:#}", label, e);
                }
            }
        }

        Self::new(resolver, workers)
    }

    /// Route one record. Returns how many exporters it was handed to.
    pub fn publish(&self, record: EventRecord) -> usize {
        let kind = record.event_name.as_str();
        let mut with_content: Option<Arc<EventRecord>> = None;
        let mut without_content: Option<Arc<EventRecord>> = None;
        let mut handed = 0;

        for worker in &self.workers {
            let id = worker.id();
            if !self.resolver.is_eligible(kind, id) {
                continue;
            }

            let shaped = if self.resolver.should_include_content(kind, id) {
                with_content.get_or_insert_with(|| Arc::new(record.clone()))
            } else {
                without_content.get_or_insert_with(|| Arc::new(record.without_content()))
            };

            worker.hand_off(Arc::clone(shaped));
            handed += 1;
        }

        if handed == 0 {
            log::trace!("No exporter wants {}", kind);
        }
        handed
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn exporter_labels(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.label()).collect()
    }

    pub fn stats(&self) -> Vec<StatsHandle> {
        self.workers.iter().map(|w| w.stats()).collect()
    }
}
