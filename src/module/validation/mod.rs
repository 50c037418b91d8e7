//! Module validation
//!
//! Version constraint matching and per-module manifest checks.

pub mod manifest_validator;
pub mod version;

pub use manifest_validator::ManifestValidator;
pub use version::{is_newer_than, satisfies, stability};
