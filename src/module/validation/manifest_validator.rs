//! Manifest validation
//!
//! Checks one module's raw manifest against the host application, the
//! runtime and the other known modules. Every problem is reported as a
//! human-readable issue; nothing here returns an error.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::module::registry::manifest::{RawManifest, DEFAULT_VERSION};
use crate::module::validation::version::satisfies;

/// Manifest validator
#[derive(Debug, Clone)]
pub struct ManifestValidator {
    /// Reserved dependency name of the host application
    host_name: String,
    /// Current host application version
    host_version: String,
    /// Reserved dependency name of the language runtime
    runtime_name: String,
    /// Current runtime version
    runtime_version: String,
    /// Modules considered loaded for conflict checks
    loaded: BTreeSet<String>,
}

impl ManifestValidator {
    /// Create a validator with the default reserved names
    pub fn new(host_version: &str, runtime_version: &str) -> Self {
        Self {
            host_name: "host".to_string(),
            host_version: host_version.to_string(),
            runtime_name: "rust".to_string(),
            runtime_version: runtime_version.to_string(),
            loaded: BTreeSet::new(),
        }
    }

    /// Create a validator from the loader configuration
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            host_name: config.host_name.clone(),
            host_version: config.host_version.clone(),
            runtime_name: config.runtime_name.clone(),
            runtime_version: config.runtime_version.clone(),
            loaded: BTreeSet::new(),
        }
    }

    /// Set the modules conflicts are checked against
    pub fn with_loaded<I, S>(mut self, loaded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loaded = loaded.into_iter().map(Into::into).collect();
        self
    }

    /// Validate module `name` against the `known` manifests
    pub fn validate(
        &self,
        name: &str,
        raw: &RawManifest,
        known: &BTreeMap<String, RawManifest>,
    ) -> Vec<String> {
        let mut issues = Vec::new();

        let has_entry = raw
            .get("entry")
            .and_then(Value::as_str)
            .is_some_and(|e| !e.trim().is_empty());
        if !has_entry {
            issues.push(format!("Module {} does not declare an entry point", name));
        }

        if let Some(requires) = raw.get("requires").and_then(Value::as_object) {
            for (dependency, constraint) in requires {
                if dependency.trim().is_empty() || constraint.is_null() {
                    continue;
                }
                let constraint = match constraint {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.check_requirement(name, dependency, &constraint, known, &mut issues);
            }
        }

        if let Some(conflicts) = raw.get("conflicts").and_then(Value::as_array) {
            for other in conflicts.iter().filter_map(Value::as_str) {
                if other != name && self.loaded.contains(other) {
                    issues.push(format!(
                        "Module {} conflicts with enabled module {}",
                        name, other
                    ));
                }
            }
        }

        if issues.is_empty() {
            debug!("Manifest validation passed for module: {}", name);
        } else {
            warn!("Manifest validation failed for module {}: {:?}", name, issues);
        }
        issues
    }

    fn check_requirement(
        &self,
        name: &str,
        dependency: &str,
        constraint: &str,
        known: &BTreeMap<String, RawManifest>,
        issues: &mut Vec<String>,
    ) {
        if dependency == self.host_name {
            if !satisfies(&self.host_version, constraint) {
                issues.push(format!(
                    "Module {} requires {} {}, running {}",
                    name, self.host_name, constraint, self.host_version
                ));
            }
            return;
        }

        if dependency == self.runtime_name {
            if !satisfies(&self.runtime_version, constraint) {
                issues.push(format!(
                    "Module {} requires {} {}, running {}",
                    name, self.runtime_name, constraint, self.runtime_version
                ));
            }
            return;
        }

        let Some(other) = known.get(dependency) else {
            issues.push(format!(
                "Module {} requires module {}, which is not available",
                name, dependency
            ));
            return;
        };

        let version = other
            .get("version")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_VERSION);
        if !satisfies(version, constraint) {
            issues.push(format!(
                "Module {} requires {} {}, found {}",
                name, dependency, constraint, version
            ));
        }
    }
}
