//! Entry point resolution
//!
//! A module's `entry` is a canonical type identifier such as
//! `blog::BlogModule`. Two tables turn it into a live module:
//!
//! - the [`LookupTable`], written by the compiler from each module's package
//!   metadata, maps namespace prefixes (`blog::`) to module directories and
//!   lists bootstrap files;
//! - the [`EntryRegistry`], populated by the host, maps identifiers to
//!   constructors.
//!
//! The [`ClassLoader`] answers "which module exposes this namespace" from the
//! first and hands out the constructor from the second.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::module::registry::manifest::Manifest;
use crate::module::traits::{Module, ModuleError};
use crate::utils::write_atomic;

/// Namespace separator used by entry identifiers and prefixes
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Constructor of a module from its root directory and manifest
pub type ModuleFactory = Box<dyn Fn(PathBuf, &Manifest) -> Box<dyn Module> + Send + Sync>;

/// Class-path lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTable {
    /// Namespace prefix -> directory
    #[serde(rename = "psr-4", default)]
    pub prefixes: BTreeMap<String, String>,
    /// Bootstrap files, registered once each
    #[serde(default)]
    pub files: Vec<String>,
}

impl LookupTable {
    /// Read a lookup table; `None` when the file does not exist
    pub fn read(path: &Path) -> Result<Option<Self>, ModuleError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::OperationError(format!(
                "Failed to read lookup table {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write the table atomically
    pub fn write(&self, path: &Path) -> Result<(), ModuleError> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path, contents.as_bytes())
    }

    /// Merge one module's autoload section, resolving paths against its root
    pub fn add_package(&mut self, module_root: &Path, autoload: &AutoloadSection) {
        for (prefix, dir) in &autoload.prefixes {
            let prefix = normalize_prefix(prefix);
            let dir = module_root.join(dir).to_string_lossy().to_string();
            if let Some(previous) = self.prefixes.insert(prefix.clone(), dir) {
                warn!("Namespace {} was already mapped to {}, overriding", prefix, previous);
            }
        }
        for file in &autoload.files {
            let file = module_root.join(file).to_string_lossy().to_string();
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
    }
}

/// Autoload section of a module's package metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AutoloadSection {
    #[serde(rename = "psr-4", default)]
    pub prefixes: BTreeMap<String, String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Package metadata file at a module root
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub autoload: AutoloadSection,
}

impl PackageMetadata {
    /// Read `<module_root>/<file_name>`; `None` when the module has none
    pub fn read(module_root: &Path, file_name: &str) -> Result<Option<Self>, ModuleError> {
        let path = module_root.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            ModuleError::OperationError(format!(
                "Failed to read package metadata {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// Host-populated table of module constructors
#[derive(Default)]
pub struct EntryRegistry {
    factories: HashMap<String, ModuleFactory>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for an entry identifier
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F)
    where
        F: Fn(PathBuf, &Manifest) -> Box<dyn Module> + Send + Sync + 'static,
    {
        let entry = entry.into();
        debug!("Registering module entry {}", entry);
        self.factories.insert(entry, Box::new(factory));
    }

    pub fn get(&self, entry: &str) -> Option<&ModuleFactory> {
        self.factories.get(entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for EntryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&String> = self.factories.keys().collect();
        entries.sort();
        f.debug_struct("EntryRegistry").field("entries", &entries).finish()
    }
}

/// Namespace-prefix resolver built from lookup tables
#[derive(Debug, Default)]
pub struct ClassLoader {
    /// Longest prefix first
    prefixes: Vec<(String, PathBuf)>,
    files: Vec<PathBuf>,
}

impl ClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lookup table; returns the number of newly registered files
    pub fn register(&mut self, table: &LookupTable) -> usize {
        for (prefix, dir) in &table.prefixes {
            self.add_prefix(prefix, dir);
        }
        table
            .files
            .iter()
            .filter(|file| self.add_file(file))
            .count()
    }

    /// Map a namespace prefix to a directory (replacing an earlier mapping)
    pub fn add_prefix(&mut self, prefix: &str, dir: impl AsRef<Path>) {
        let prefix = normalize_prefix(prefix);
        self.prefixes.retain(|(p, _)| *p != prefix);
        self.prefixes.push((prefix, dir.as_ref().to_path_buf()));
        self.prefixes
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    /// Register a bootstrap file; false when it was already registered
    pub fn add_file(&mut self, file: impl AsRef<Path>) -> bool {
        let file = file.as_ref();
        if self.files.iter().any(|f| f == file) {
            return false;
        }
        if !file.exists() {
            warn!("Bootstrap file {:?} does not exist", file);
        }
        debug!("Registered bootstrap file {:?}", file);
        self.files.push(file.to_path_buf());
        true
    }

    /// Registered bootstrap files, in registration order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Longest registered prefix exposing `entry`, with its directory
    pub fn locate(&self, entry: &str) -> Option<(&str, &Path)> {
        self.prefixes
            .iter()
            .find(|(prefix, _)| entry.starts_with(prefix.as_str()) && entry.len() > prefix.len())
            .map(|(prefix, dir)| (prefix.as_str(), dir.as_path()))
    }

    /// Resolve `entry` to a constructor
    ///
    /// The entry's namespace must be exposed by a registered prefix and the
    /// identifier must have a constructor in `registry`.
    pub fn resolve<'r>(&self, entry: &str, registry: &'r EntryRegistry) -> Option<&'r ModuleFactory> {
        self.locate(entry)?;
        registry.get(entry)
    }
}

/// `blog` and `blog::` both become `blog::`
fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim().trim_end_matches(':');
    format!("{}{}", prefix, NAMESPACE_SEPARATOR)
}
