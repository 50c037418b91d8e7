//! Shared utilities

pub mod fs;
pub mod logging;

pub use fs::write_atomic;
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
