//! Module system traits and interfaces
//!
//! Defines the capability contract every module implements, the host
//! application seam, and the error type shared by the whole module system.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::module::registry::manifest::Manifest;

/// Runtime loader lifecycle state
///
/// The loader walks these states in order. `Booted` and `Failed` are
/// terminal; a missing compiled plan sends the loader back to `Idle` with
/// no modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Nothing loaded yet (or no compiled plan exists)
    Idle,
    /// Looking for the compiled plan on disk
    DiscoveringPlan,
    /// Compiled plan read into memory
    PlanFound,
    /// Lookup table prefixes and bootstrap files registered
    AutoloadRegistered,
    /// Every enabled entry constructed
    ModulesInstantiated,
    /// `register` called on every module
    Registered,
    /// `boot` called on every module
    Booted,
    /// Loading or booting returned an error; no modules are held
    Failed,
}

/// Host application seen from a module
///
/// The real application (router, container, templating) lives outside this
/// crate. Modules only get what they need to wire themselves in.
pub trait Application {
    /// Current host application version
    fn version(&self) -> &str;

    /// Root directory of the host application
    fn base_path(&self) -> &Path;
}

/// Module capability contract
///
/// Every entry point named in a manifest resolves to a type implementing
/// this trait. The host drives a two-phase startup: `register` on every
/// module in load order, then `boot` on every module in the same order.
pub trait Module: Send + Sync {
    /// Module name as declared in its manifest
    fn name(&self) -> &str {
        &self.manifest().name
    }

    /// Manifest the module was constructed with
    fn manifest(&self) -> &Manifest;

    /// Bind services into the host application
    fn register(&mut self, app: &mut dyn Application) -> Result<(), ModuleError>;

    /// Start using services registered by this and earlier modules
    fn boot(&mut self, app: &mut dyn Application) -> Result<(), ModuleError>;

    /// Resolve a path inside the module root
    fn path(&self, subpath: &str) -> PathBuf {
        let root = PathBuf::from(&self.manifest().path);
        let subpath = subpath.trim_start_matches(['/', '\\']);
        if subpath.is_empty() {
            root
        } else {
            root.join(subpath)
        }
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Entry point {entry} of module {module} could not be resolved")]
    EntryNotFound { module: String, entry: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module initialization failed: {0}")]
    InitializationError(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}
