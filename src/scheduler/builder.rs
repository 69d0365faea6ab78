/*!
 * Kernel Builder
 * Builder pattern for Kernel construction
 */

use super::config::KernelConfig;
use super::kernel::Kernel;
use crate::clock::ClockProvider;
use crate::core::errors::KernelError;
use crate::core::types::KernelResult;
use crate::persistence::{MemoryStore, SnapshotStore};
use crate::process::registry::ProcessRegistry;
use std::sync::Arc;

/// Builder for Kernel
///
/// A clock is required; the store defaults to an in-memory store, the
/// registry to an empty one and the config to `KernelConfig::default()`.
pub struct KernelBuilder {
    clock: Option<Arc<dyn ClockProvider>>,
    store: Option<Arc<dyn SnapshotStore>>,
    registry: ProcessRegistry,
    config: KernelConfig,
}

impl KernelBuilder {
    /// Create a new Kernel builder
    pub fn new() -> Self {
        Self {
            clock: None,
            store: None,
            registry: ProcessRegistry::new(),
            config: KernelConfig::default(),
        }
    }

    /// Set the compute meter
    pub fn with_clock<C: ClockProvider + 'static>(mut self, clock: Arc<C>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the durable snapshot store
    pub fn with_store<S: SnapshotStore + 'static>(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the factories used by `restore`
    pub fn with_registry(mut self, registry: ProcessRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the kernel
    pub fn build(self) -> KernelResult<Kernel> {
        let clock = self.clock.ok_or_else(|| {
            KernelError::Configuration("a clock provider is required".into())
        })?;
        self.config.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn SnapshotStore>);

        Ok(Kernel::from_parts(clock, store, self.registry, self.config))
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
