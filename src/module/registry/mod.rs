//! Module registry
//!
//! Discovery, manifests, administrative state and dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod manifest;
pub mod state;

pub use dependencies::ModuleDependencies;
pub use discovery::ModuleDiscovery;
pub use manifest::{Manifest, RawManifest};
pub use state::AdminState;
