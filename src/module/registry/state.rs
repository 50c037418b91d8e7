//! Administrative module state
//!
//! The operator-controlled list of enabled modules, persisted as
//! `{ "enabled": [...] }`. Independent of each manifest's own `enabled`
//! default: only modules both discovered and listed here get compiled.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::module::traits::ModuleError;
use crate::utils::write_atomic;

/// Persisted administrative state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminState {
    /// Enabled module names, in the order they were enabled
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl AdminState {
    /// Load state from `path`; a missing file is an empty state
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No module state file at {:?}, nothing enabled", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::OperationError(format!(
                "Failed to read module state {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist state to `path` (whole-file overwrite)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModuleError> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path.as_ref(), contents.as_bytes())?;
        Ok(())
    }

    /// Enable a module; returns false when it already was
    pub fn enable(&mut self, name: &str) -> bool {
        if self.is_enabled(name) {
            return false;
        }
        info!("Enabling module {}", name);
        self.enabled.push(name.to_string());
        true
    }

    /// Disable a module; returns false when it was not enabled
    pub fn disable(&mut self, name: &str) -> bool {
        let before = self.enabled.len();
        self.enabled.retain(|n| n != name);
        let changed = self.enabled.len() != before;
        if changed {
            info!("Disabling module {}", name);
        }
        changed
    }

    /// Check whether a module is administratively enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| n == name)
    }
}
