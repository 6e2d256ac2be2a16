//! Resource identity registry
//!
//! Hands out small, stable integers for resource addresses so every event
//! about the same file can be correlated within a session.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Identity assigned to a tracked resource. `0` means "no resource".
pub type ResourceId = u64;

/// Identity used for resource-less events such as window focus changes
pub const NO_RESOURCE: ResourceId = 0;

#[derive(Debug)]
struct RegistryState {
    ids: HashMap<String, ResourceId>,
    next: ResourceId,
}

/// Session-scoped address → identity map
#[derive(Debug)]
pub struct ResourceRegistry {
    state: Mutex<RegistryState>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                ids: HashMap::new(),
                next: 1,
            }),
        }
    }

    /// Look up the identity for an address, allocating the next one on first sight.
    ///
    /// The lookup and the allocation happen under one lock, so two callers
    /// racing on a new address always agree on the result.
    pub fn identity_for(&self, address: &str) -> ResourceId {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(id) = state.ids.get(address) {
            return *id;
        }

        let id = state.next;
        state.next += 1;
        state.ids.insert(address.to_string(), id);
        log::debug!("Assigned resource id {} to {}", id, address);
        id
    }

    /// Number of distinct addresses seen so far
    pub fn resource_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).ids.len()
    }
}
