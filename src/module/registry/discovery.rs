//! Module discovery
//!
//! Collects candidate modules from three sources, in order:
//! configuration-declared modules, filesystem glob patterns (plus tenant
//! patterns) and the installed package index. A later source overrides
//! an earlier one on a name collision.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{LoaderConfig, TENANT_PLACEHOLDER};
use crate::module::registry::manifest::{read_raw, RawManifest};
use crate::module::traits::ModuleError;

/// One entry of the installed package index written by the package manager
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(rename = "type", default)]
    pub package_type: Option<String>,
    #[serde(rename = "install-path", default)]
    pub install_path: Option<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Module discovery scanner
pub struct ModuleDiscovery<'a> {
    config: &'a LoaderConfig,
}

impl<'a> ModuleDiscovery<'a> {
    /// Create a new discovery scanner over `config`
    pub fn new(config: &'a LoaderConfig) -> Self {
        Self { config }
    }

    /// Discover all candidate modules, keyed by name
    pub fn discover(&self) -> Result<BTreeMap<String, RawManifest>, ModuleError> {
        let mut found = BTreeMap::new();

        self.discover_declared(&mut found);
        self.discover_filesystem(&self.patterns(), &mut found);
        self.discover_installed(&mut found)?;

        info!("Discovered {} modules", found.len());
        Ok(found)
    }

    /// Modules declared in configuration
    fn discover_declared(&self, found: &mut BTreeMap<String, RawManifest>) {
        for (name, fields) in &self.config.declared {
            if name.trim().is_empty() {
                warn!("Skipping configured module with an empty name");
                continue;
            }

            let mut raw = fields.clone();
            raw.insert("name".to_string(), Value::String(name.clone()));
            if let Some(path) = raw.get("path").and_then(Value::as_str) {
                let resolved = self.config.resolve(path);
                raw.insert("path".to_string(), path_value(&resolved));
            }

            debug!("Found configured module {}", name);
            found.insert(name.clone(), raw);
        }
    }

    /// Glob patterns to scan, with tenant patterns expanded when a tenant is active
    pub fn patterns(&self) -> Vec<String> {
        self.patterns_for(self.config.effective_tenant().as_deref())
    }

    /// Glob patterns to scan for an explicit tenant
    pub fn patterns_for(&self, tenant: Option<&str>) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .config
            .paths
            .iter()
            .map(|p| self.config.resolve(p).to_string_lossy().to_string())
            .collect();

        match tenant {
            Some(tenant) => {
                for pattern in &self.config.tenant_paths {
                    let expanded = pattern.replace(TENANT_PLACEHOLDER, tenant);
                    patterns.push(self.config.resolve(&expanded).to_string_lossy().to_string());
                }
            }
            None if !self.config.tenant_paths.is_empty() => {
                debug!("No tenant active, tenant module paths not scanned");
            }
            None => {}
        }

        patterns
    }

    /// Module directories matching the configured glob patterns
    fn discover_filesystem(&self, patterns: &[String], found: &mut BTreeMap<String, RawManifest>) {
        for pattern in patterns {
            let entries = match glob::glob(pattern) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping malformed module path pattern {:?}: {}", pattern, e);
                    continue;
                }
            };

            for entry in entries {
                let dir = match entry {
                    Ok(dir) => dir,
                    Err(e) => {
                        debug!("Unreadable path while scanning {:?}: {}", pattern, e);
                        continue;
                    }
                };

                if let Some((name, raw)) = self.read_candidate(&dir) {
                    debug!("Found module {} in {:?}", name, dir);
                    found.insert(name, raw);
                }
            }
        }
    }

    /// Read a candidate directory; `None` when it is not a module
    fn read_candidate(&self, dir: &Path) -> Option<(String, RawManifest)> {
        if !dir.is_dir() {
            return None;
        }

        let manifest_path = dir.join(&self.config.manifest_file);
        if !manifest_path.is_file() {
            debug!("No {} found in {:?}, skipping", self.config.manifest_file, dir);
            return None;
        }

        let mut raw = match read_raw(&manifest_path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping {:?}: {}", manifest_path, e);
                return None;
            }
        };

        let name = match raw.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("Skipping {:?}: manifest has no name", manifest_path);
                return None;
            }
        };

        let path = match raw.get("path").and_then(Value::as_str) {
            Some(p) if !p.trim().is_empty() => dir.join(p),
            _ => dir.to_path_buf(),
        };
        raw.insert("path".to_string(), path_value(&path));

        Some((name, raw))
    }

    /// Modules installed through the package manager
    fn discover_installed(&self, found: &mut BTreeMap<String, RawManifest>) -> Result<(), ModuleError> {
        let index_path = self.config.resolve(&self.config.installed_index);
        if !index_path.is_file() {
            debug!("No installed package index at {:?}", index_path);
            return Ok(());
        }

        let contents = std::fs::read_to_string(&index_path).map_err(|e| {
            ModuleError::OperationError(format!(
                "Failed to read package index {}: {}",
                index_path.display(),
                e
            ))
        })?;
        let index_dir = index_path.parent().unwrap_or(Path::new(""));

        for package in parse_index(&contents) {
            if package.package_type.as_deref() != Some(self.config.package_type.as_str()) {
                continue;
            }
            if let Some((name, raw)) = self.package_manifest(index_dir, package) {
                debug!("Found installed module {}", name);
                found.insert(name, raw);
            }
        }

        Ok(())
    }

    fn package_manifest(
        &self,
        index_dir: &Path,
        package: InstalledPackage,
    ) -> Option<(String, RawManifest)> {
        let Some(mut raw) = package.extra.get("module").and_then(Value::as_object).cloned() else {
            warn!("Skipping package {}: no module section", package.name);
            return None;
        };

        let name = match raw.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("Skipping package {}: module section has no name", package.name);
                return None;
            }
        };

        let root: PathBuf = match &package.install_path {
            Some(install_path) => index_dir.join(install_path),
            None => index_dir.join(&package.name),
        };
        let path = match raw.get("path").and_then(Value::as_str) {
            Some(p) if !p.trim().is_empty() => root.join(p),
            _ => root,
        };
        raw.insert("path".to_string(), path_value(&path));

        let has_version = raw
            .get("version")
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty());
        if let (false, Some(version)) = (has_version, package.version) {
            raw.insert("version".to_string(), Value::String(version));
        }

        Some((name, raw))
    }
}

/// Decode the package index one entry at a time
///
/// A malformed document yields no packages; a malformed entry is skipped.
fn parse_index(contents: &str) -> Vec<InstalledPackage> {
    let document: Value = match serde_json::from_str(contents) {
        Ok(document) => document,
        Err(e) => {
            warn!("Ignoring malformed package index: {}", e);
            return Vec::new();
        }
    };
    let entries = match document.get("packages") {
        Some(Value::Array(entries)) => entries.clone(),
        Some(_) => {
            warn!("Ignoring package index: packages is not a list");
            return Vec::new();
        }
        None => return Vec::new(),
    };

    let mut packages = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<InstalledPackage>(entry) {
            Ok(package) => packages.push(package),
            Err(e) => warn!("Skipping package index entry {}: {}", position, e),
        }
    }
    packages
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().to_string())
}
