//! Loader context
//!
//! Everything the discovery, compile and load steps share: the configuration
//! and the host's entry registry. One context is built at process start and
//! passed down; there is no global state.

use crate::config::LoaderConfig;
use crate::module::compiler::ModuleCompiler;
use crate::module::loader::{EntryRegistry, ModuleLoader};

/// Shared state of the module system
#[derive(Debug, Default)]
pub struct LoaderContext {
    config: LoaderConfig,
    registry: EntryRegistry,
}

impl LoaderContext {
    pub fn new(config: LoaderConfig, registry: EntryRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntryRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntryRegistry {
        &mut self.registry
    }

    /// Compiler over this context
    pub fn compiler(&self) -> ModuleCompiler<'_> {
        ModuleCompiler::new(self)
    }

    /// Runtime loader over this context
    pub fn loader(&self) -> ModuleLoader<'_> {
        ModuleLoader::new(self)
    }
}
