//! Configuration management for modkit
//!
//! Handles configuration loading, validation and path resolution. Every
//! field has a default, so an empty file (or no file at all) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::module::registry::manifest::RawManifest;

/// Environment variable overriding the configured tenant id
pub const TENANT_ENV: &str = "MODKIT_TENANT";

/// Placeholder substituted with the tenant id in tenant patterns
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modkit=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

/// Module loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory every relative path below is resolved against
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Host application version checked against `requires.<host_name>`
    #[serde(default = "default_host_version")]
    pub host_version: String,

    /// Runtime version checked against `requires.<runtime_name>`
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    /// Reserved dependency name denoting the host application
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Reserved dependency name denoting the language runtime
    #[serde(default = "default_runtime_name")]
    pub runtime_name: String,

    /// Manifest file name looked up in each candidate directory
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Package metadata file name in each module root (autoload section)
    #[serde(default = "default_package_file")]
    pub package_file: String,

    /// Glob patterns of module directories
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    /// Glob patterns containing `{tenant}`, scanned when a tenant is active
    #[serde(default)]
    pub tenant_paths: Vec<String>,

    /// Current tenant id (multi-tenancy is active when set)
    #[serde(default)]
    pub tenant: Option<String>,

    /// Installed package index written by the package manager
    #[serde(default = "default_installed_index")]
    pub installed_index: String,

    /// Package `type` marking an installed package as a module
    #[serde(default = "default_package_type")]
    pub package_type: String,

    /// Modules declared directly in configuration (name -> manifest fields)
    #[serde(default)]
    pub declared: BTreeMap<String, RawManifest>,

    /// Administrative state file (`{ "enabled": [...] }`)
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Compiled plan file
    #[serde(default = "default_plan_file")]
    pub plan_file: String,

    /// Class-path lookup table file
    #[serde(default = "default_autoload_file")]
    pub autoload_file: String,

    /// Require a registered factory for every entry during compile verification
    #[serde(default = "default_true")]
    pub require_factory: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

fn default_base_path() -> String {
    ".".to_string()
}

fn default_host_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_runtime_version() -> String {
    env!("CARGO_PKG_RUST_VERSION").to_string()
}

fn default_host_name() -> String {
    "host".to_string()
}

fn default_runtime_name() -> String {
    "rust".to_string()
}

fn default_manifest_file() -> String {
    "module.json".to_string()
}

fn default_package_file() -> String {
    "package.json".to_string()
}

fn default_paths() -> Vec<String> {
    vec!["modules/*".to_string()]
}

fn default_installed_index() -> String {
    "vendor/installed.json".to_string()
}

fn default_package_type() -> String {
    "modkit-module".to_string()
}

fn default_state_file() -> String {
    "storage/modules.json".to_string()
}

fn default_plan_file() -> String {
    "bootstrap/cache/modules.json".to_string()
}

fn default_autoload_file() -> String {
    "bootstrap/cache/autoload.json".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            host_version: default_host_version(),
            runtime_version: default_runtime_version(),
            host_name: default_host_name(),
            runtime_name: default_runtime_name(),
            manifest_file: default_manifest_file(),
            package_file: default_package_file(),
            paths: default_paths(),
            tenant_paths: Vec::new(),
            tenant: None,
            installed_index: default_installed_index(),
            package_type: default_package_type(),
            declared: BTreeMap::new(),
            state_file: default_state_file(),
            plan_file: default_plan_file(),
            autoload_file: default_autoload_file(),
            require_factory: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Configuration rooted at `base_path`, everything else defaulted
    pub fn with_base_path<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.manifest_file.trim().is_empty() {
            return Err(anyhow::anyhow!("manifest_file must not be empty"));
        }
        if self.package_file.trim().is_empty() {
            return Err(anyhow::anyhow!("package_file must not be empty"));
        }
        if self.host_name == self.runtime_name {
            return Err(anyhow::anyhow!(
                "host_name and runtime_name must differ (both are {:?})",
                self.host_name
            ));
        }

        let artifacts = [&self.state_file, &self.plan_file, &self.autoload_file];
        for (i, a) in artifacts.iter().enumerate() {
            if a.trim().is_empty() {
                return Err(anyhow::anyhow!("artifact file paths must not be empty"));
            }
            if artifacts[i + 1..].contains(a) {
                return Err(anyhow::anyhow!(
                    "state_file, plan_file and autoload_file must be distinct ({} is reused)",
                    a
                ));
            }
        }

        Ok(())
    }

    /// Resolve a configured path against `base_path`
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_path).join(path)
        }
    }

    /// Active tenant id: `MODKIT_TENANT` if set and non-empty, else config
    pub fn effective_tenant(&self) -> Option<String> {
        std::env::var(TENANT_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.tenant.clone().filter(|t| !t.trim().is_empty()))
    }

    pub fn state_path(&self) -> PathBuf {
        self.resolve(&self.state_file)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.resolve(&self.plan_file)
    }

    pub fn autoload_path(&self) -> PathBuf {
        self.resolve(&self.autoload_file)
    }
}
