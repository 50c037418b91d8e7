//! Compiled plan artifact
//!
//! The frozen output of a successful compile and the only module list the
//! runtime loader trusts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::module::registry::manifest::{Manifest, RawManifest};
use crate::module::traits::ModuleError;
use crate::utils::write_atomic;

/// Key holding the 1-based position of an entry in the plan
pub const LOAD_ORDER_KEY: &str = "load_order";

/// Compiled plan file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPlan {
    /// When the plan was compiled
    pub timestamp: DateTime<Utc>,
    /// Host application version at compile time
    pub version: String,
    /// Manifest fields plus `load_order`, ascending
    #[serde(default)]
    pub modules: Vec<RawManifest>,
}

/// One plan entry read back into a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub load_order: u64,
    pub manifest: Manifest,
}

impl CompiledPlan {
    /// Build a plan from manifests already in load order
    pub fn new(host_version: &str, ordered: &[Manifest]) -> Self {
        let modules = ordered
            .iter()
            .enumerate()
            .map(|(i, manifest)| {
                let mut entry = manifest.to_map();
                entry.insert("enabled".to_string(), Value::Bool(true));
                entry.insert(LOAD_ORDER_KEY.to_string(), Value::from(i as u64 + 1));
                entry
            })
            .collect();

        Self {
            timestamp: Utc::now(),
            version: host_version.to_string(),
            modules,
        }
    }

    /// Read a plan; `None` when no plan has been compiled
    pub fn read(path: &Path) -> Result<Option<Self>, ModuleError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::OperationError(format!("Failed to read plan {}: {}", path.display(), e))
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write the plan atomically
    pub fn write(&self, path: &Path) -> Result<(), ModuleError> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path, contents.as_bytes())
    }

    /// Module names in plan order
    pub fn names(&self) -> Vec<String> {
        self.modules
            .iter()
            .filter_map(|m| m.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Entries as manifests, sorted by ascending `load_order`
    ///
    /// No constraint is re-checked; an entry missing a load order keeps its
    /// position in the file.
    pub fn entries(&self) -> Result<Vec<PlanEntry>, ModuleError> {
        let mut entries = self
            .modules
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut raw = raw.clone();
                let load_order = raw
                    .remove(LOAD_ORDER_KEY)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(i as u64 + 1);
                let enabled = raw.get("enabled").and_then(Value::as_bool).unwrap_or(true);
                let name = raw
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_default();
                let manifest = Manifest::normalize(&name, &raw, enabled)?;
                Ok(PlanEntry {
                    load_order,
                    manifest,
                })
            })
            .collect::<Result<Vec<_>, ModuleError>>()?;

        entries.sort_by_key(|e| e.load_order);
        Ok(entries)
    }
}
