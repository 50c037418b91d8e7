//! Module manifest normalization
//!
//! Turns a loosely typed manifest record (a JSON object read from
//! `module.json`, a config entry, or an installed package) into a
//! [`Manifest`] value object with required fields checked and optional
//! fields defaulted. Unknown keys are carried in `extra` so a manifest
//! written by a newer tool survives a round trip through an older one.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::module::traits::ModuleError;

/// Raw manifest as read from disk or configuration
pub type RawManifest = Map<String, Value>;

/// Version assumed when a manifest does not declare one
pub const DEFAULT_VERSION: &str = "0.0.0";

const KNOWN_FIELDS: &[&str] = &[
    "name",
    "version",
    "path",
    "entry",
    "enabled",
    "requires",
    "conflicts",
    "provides",
    "description",
    "stability",
];

/// Validated module manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Module name (unique key)
    pub name: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Module root directory
    pub path: String,
    /// Canonical type identifier of the module implementation
    pub entry: String,
    /// Default enabled flag (independent of the administrative state)
    pub enabled: bool,
    /// Dependency name -> version constraint
    pub requires: BTreeMap<String, String>,
    /// Modules that must not be enabled alongside this one
    pub conflicts: Vec<String>,
    /// Capabilities provided (informational)
    pub provides: Map<String, Value>,
    /// Human-readable description
    pub description: String,
    /// Optional stability tag
    pub stability: Option<String>,
    /// Unrecognised keys, passed through untouched
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Build a manifest from raw fields
    ///
    /// `name` is the discovery key and wins over any `name` field in `raw`.
    /// `enabled` is the discovery-time default and wins over any `enabled`
    /// field in `raw`.
    pub fn normalize(name: &str, raw: &RawManifest, enabled: bool) -> Result<Self, ModuleError> {
        if name.trim().is_empty() {
            return Err(ModuleError::InvalidManifest(
                "Module name cannot be empty".to_string(),
            ));
        }

        let path = string_field(raw, "path");
        if path.is_empty() {
            return Err(ModuleError::InvalidManifest(format!(
                "Module {} has no path",
                name
            )));
        }

        let entry = string_field(raw, "entry");
        if entry.is_empty() {
            return Err(ModuleError::InvalidManifest(format!(
                "Module {} has no entry point",
                name
            )));
        }

        let version = match string_field(raw, "version") {
            v if v.is_empty() => DEFAULT_VERSION.to_string(),
            v => v,
        };

        let stability = raw
            .get("stability")
            .and_then(Value::as_str)
            .map(str::to_string);

        let provides = raw
            .get("provides")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let extra = raw
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            name: name.to_string(),
            version,
            path,
            entry,
            enabled,
            requires: requires_field(raw),
            conflicts: conflicts_field(raw),
            provides,
            description: string_field(raw, "description"),
            stability,
            extra,
        })
    }

    /// Convert back to a raw map
    ///
    /// Extra keys are spread at top level, exactly as they were read.
    pub fn to_map(&self) -> RawManifest {
        let mut map = self.extra.clone();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("version".to_string(), Value::String(self.version.clone()));
        map.insert("path".to_string(), Value::String(self.path.clone()));
        map.insert("entry".to_string(), Value::String(self.entry.clone()));
        map.insert("enabled".to_string(), Value::Bool(self.enabled));
        map.insert(
            "requires".to_string(),
            Value::Object(
                self.requires
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        map.insert(
            "conflicts".to_string(),
            Value::Array(self.conflicts.iter().cloned().map(Value::String).collect()),
        );
        map.insert("provides".to_string(), Value::Object(self.provides.clone()));
        map.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(stability) = &self.stability {
            map.insert("stability".to_string(), Value::String(stability.clone()));
        }
        map
    }

    /// Names of the sibling modules this module requires
    ///
    /// Entries naming the host application or the runtime are not
    /// modules; callers filter those against the set they resolve over.
    pub fn required_modules(&self) -> impl Iterator<Item = &str> {
        self.requires.keys().map(String::as_str)
    }
}

/// Read a manifest file as a raw JSON object
pub fn read_raw(path: &Path) -> Result<RawManifest, ModuleError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ModuleError::InvalidManifest(format!(
            "Failed to read manifest file {}: {}",
            path.display(),
            e
        ))
    })?;

    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(ModuleError::InvalidManifest(format!(
            "Manifest {} is not a JSON object",
            path.display()
        ))),
    }
}

fn string_field(raw: &RawManifest, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn requires_field(raw: &RawManifest) -> BTreeMap<String, String> {
    let Some(requires) = raw.get("requires").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    requires
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .filter_map(|(name, constraint)| {
            let constraint = match constraint {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((name.clone(), constraint))
        })
        .collect()
}

fn conflicts_field(raw: &RawManifest) -> Vec<String> {
    raw.get("conflicts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
