//! Capture pipeline lifecycle
//!
//! Ties the pieces together for one session: a host bus, the identity
//! registry, the router and one subscription per producer. Shutting down
//! cancels the subscriptions first, so no new records arrive, then drains
//! and closes every exporter.

use std::sync::Arc;

use crate::config::Config;
use crate::exporter::ExporterStats;
use crate::host::{HostBus, RawNotification, Subscription};
use crate::producer::{self, ProducerContext};
use crate::registry::ResourceRegistry;
use crate::routing::Router;
use crate::session::SessionContext;

pub struct Pipeline {
    bus: HostBus,
    router: Arc<Router>,
    session: Arc<SessionContext>,
    registry: Arc<ResourceRegistry>,
    subscriptions: Vec<Subscription>,
}

impl Pipeline {
    pub fn start(config: &Config) -> Self {
        let session = Arc::new(SessionContext::from_config(config));
        Self::with_session(config, session)
    }

    pub fn with_session(config: &Config, session: Arc<SessionContext>) -> Self {
        let bus = HostBus::new();
        let registry = Arc::new(ResourceRegistry::new());
        let router = Arc::new(Router::from_config(config));

        let context = Arc::new(ProducerContext::new(
            Arc::clone(&session),
            Arc::clone(&registry),
            Arc::clone(&router) as Arc<dyn crate::routing::Publish>,
        ));
        let subscriptions = producer::subscribe_all(&bus, &context);
        log::info!("Subscribed {} producers", subscriptions.len());

        Self {
            bus,
            router,
            session,
            registry,
            subscriptions,
        }
    }

    /// Feed one host notification through the producers
    pub fn deliver(&self, notification: &RawNotification) {
        self.bus.deliver(notification);
    }

    #[cfg(test)]
    pub fn bus(&self) -> &HostBus {
        &self.bus
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Rebuild routing from a new configuration
    pub fn reload(&self, config: &Config) {
        self.router.reload(config);
    }

    pub fn shutdown(self) -> Vec<ExporterStats> {
        let Self {
            router, subscriptions, ..
        } = self;

        for subscription in subscriptions {
            subscription.cancel();
        }

        let stats = router.shutdown();
        log::info!("Pipeline stopped");
        stats
    }
}
