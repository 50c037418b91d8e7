//! modkit - plugin module loading for modular applications
//!
//! Discovers candidate modules, validates their declared requirements,
//! computes a safe load order, freezes that decision into a compiled plan,
//! and loads the plan quickly at process start.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modkit::{EntryRegistry, LoaderConfig, LoaderContext};
//!
//! # fn main() -> Result<(), modkit::ModuleError> {
//! let context = LoaderContext::new(LoaderConfig::with_base_path("/srv/app"), EntryRegistry::new());
//! let report = context.compiler().compile()?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use module::{
    Application, CompileOutcome, CompileReport, EntryRegistry, LoaderContext, Manifest, Module,
    ModuleError, ModuleLoader, ModuleManager, ModuleState,
};
