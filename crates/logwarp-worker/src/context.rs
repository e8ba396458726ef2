//! Shared worker state

use std::sync::Arc;

use crate::bus::EventBus;
use crate::settings::Settings;
use crate::store::DocumentStore;

/// Built once at startup and shared by every job
#[derive(Clone)]
pub struct WorkerContext {
    pub settings: Settings,
    pub bus: Arc<dyn EventBus>,
    pub store: Arc<dyn DocumentStore>,
}

impl WorkerContext {
    pub fn new(settings: Settings, bus: Arc<dyn EventBus>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            settings,
            bus,
            store,
        }
    }

    pub fn output_subject(&self) -> &str {
        &self.settings.nats.output_subject
    }
}
