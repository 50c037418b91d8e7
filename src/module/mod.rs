//! Module system
//!
//! Plugin loading for a modular application, in two halves:
//!
//! - **Compile** (administrative, infrequent): discover candidate modules,
//!   keep the administratively enabled ones, validate their requirements,
//!   resolve a load order and freeze it into a compiled plan plus a
//!   namespace lookup table.
//! - **Load** (every process start): read the plan, resolve each entry
//!   point through the host's entry registry, then register and boot the
//!   modules in order. No discovery or validation happens on this path.

pub mod compiler;
pub mod context;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod validation;

pub use compiler::{CompileOutcome, CompileReport, ModuleCompiler, ModuleStatus};
pub use context::LoaderContext;
pub use loader::{ClassLoader, EntryRegistry, LookupTable, ModuleLoader};
pub use manager::{ListStatus, ModuleListing, ModuleManager};
pub use registry::{AdminState, Manifest, ModuleDependencies, ModuleDiscovery, RawManifest};
pub use traits::{Application, Module, ModuleError, ModuleState};
pub use validation::ManifestValidator;
