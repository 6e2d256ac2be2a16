//! Active-event resolution
//!
//! Answers two questions for an (event kind, exporter) pair: should the
//! exporter receive the event at all, and should it get the content
//! payload. An exporter with its own list uses that list in full and never
//! looks at the global one.

use indexmap::IndexMap;

use crate::config::{ActiveEventEntry, Config};

/// Index of an exporter in the configured exporter list
pub type ExporterId = usize;

/// Event kind → "include full content" flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveEvents {
    entries: IndexMap<String, bool>,
}

impl ActiveEvents {
    /// Build from config entries; a repeated name keeps its last flag
    pub fn from_entries(entries: &[ActiveEventEntry]) -> Self {
        let mut map = IndexMap::with_capacity(entries.len());
        for entry in entries {
            map.insert(entry.name.clone(), entry.log_whole_document);
        }
        Self { entries: map }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn include_content(&self, kind: &str) -> bool {
        self.entries.get(kind).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

/// Read-only snapshot of the routing configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    global: ActiveEvents,
    overrides: Vec<Option<ActiveEvents>>,
}

impl ConfigResolver {
    pub fn new(global: ActiveEvents, overrides: Vec<Option<ActiveEvents>>) -> Self {
        Self { global, overrides }
    }

    pub fn from_config(config: &Config) -> Self {
        let global = ActiveEvents::from_entries(&config.active_events);
        let overrides = config
            .exporters
            .iter()
            .map(|e| e.active_events.as_deref().map(ActiveEvents::from_entries))
            .collect();
        Self::new(global, overrides)
    }

    /// The list that governs this exporter: its override when present, else the global list
    pub fn applicable(&self, exporter: ExporterId) -> &ActiveEvents {
        self.overrides
            .get(exporter)
            .and_then(Option::as_ref)
            .unwrap_or(&self.global)
    }

    pub fn has_override(&self, exporter: ExporterId) -> bool {
        matches!(self.overrides.get(exporter), Some(Some(_)))
    }

    pub fn is_eligible(&self, kind: &str, exporter: ExporterId) -> bool {
        self.applicable(exporter).contains(kind)
    }

    pub fn should_include_content(&self, kind: &str, exporter: ExporterId) -> bool {
        self.applicable(exporter).include_content(kind)
    }

    /// Whether any exporter at all would receive this kind
    pub fn is_routed(&self, kind: &str) -> bool {
        (0..self.exporter_count()).any(|id| self.is_eligible(kind, id))
    }

    pub fn global(&self) -> &ActiveEvents {
        &self.global
    }

    pub fn exporter_count(&self) -> usize {
        self.overrides.len()
    }
}
