//! Module loading
//!
//! Entry point resolution and the runtime loader.

pub mod autoload;
pub mod loader;

pub use autoload::{ClassLoader, EntryRegistry, LookupTable, ModuleFactory, PackageMetadata};
pub use loader::ModuleLoader;
