/*!
 * Process Registry
 *
 * Factories keyed by process type name, used to rebuild processes from a
 * snapshot. The registry is an explicit object handed to the kernel builder
 * by the composition root; there is no global factory map.
 */

use super::traits::Process;
use crate::core::data_structures::InlineString;
use crate::core::types::{Pid, Priority};
use ahash::AHashMap;
use serde_json::Value;
use tracing::debug;

/// Identity and payload handed to a factory on restore
#[derive(Debug, Clone)]
pub struct ProcessSeed {
    pub id: Pid,
    pub priority: Priority,
    pub parent: Option<Pid>,
    pub payload: Value,
}

/// Builds a process from its durable descriptor
pub type ProcessFactory = Box<dyn Fn(ProcessSeed) -> anyhow::Result<Box<dyn Process>>>;

/// Type name → factory map
#[derive(Default)]
pub struct ProcessRegistry {
    factories: AHashMap<InlineString, ProcessFactory>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same name replaces it
    pub fn register<F>(&mut self, type_name: impl Into<InlineString>, factory: F)
    where
        F: Fn(ProcessSeed) -> anyhow::Result<Box<dyn Process>> + 'static,
    {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            debug!(type_name = %type_name, "Process factory replaced");
        } else {
            debug!(type_name = %type_name, "Process factory registered");
        }
    }

    /// Register `P::default()` followed by `Process::restore(payload)`
    pub fn register_default<P>(&mut self, type_name: impl Into<InlineString>)
    where
        P: Process + Default + 'static,
    {
        self.register(type_name, |seed: ProcessSeed| {
            let mut process = P::default();
            process.restore(seed.payload)?;
            Ok(Box::new(process) as Box<dyn Process>)
        });
    }

    /// Builder-style registration
    #[must_use]
    pub fn with<F>(mut self, type_name: impl Into<InlineString>, factory: F) -> Self
    where
        F: Fn(ProcessSeed) -> anyhow::Result<Box<dyn Process>> + 'static,
    {
        self.register(type_name, factory);
        self
    }

    #[inline]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Run the factory for `type_name`; `None` when no factory is registered
    pub fn build(
        &self,
        type_name: &str,
        seed: ProcessSeed,
    ) -> Option<anyhow::Result<Box<dyn Process>>> {
        self.factories.get(type_name).map(|factory| factory(seed))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
