//! Test utilities for module system testing
//!
//! Provides an isolated application tree, module fixtures and a recording
//! module implementation.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use modkit::module::AdminState;
use modkit::{Application, EntryRegistry, LoaderConfig, LoaderContext, Manifest, Module, ModuleError};

/// Shared event log written by [`RecordingModule`]
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Test fixture for module system tests
pub struct ModuleTestFixture {
    /// Temporary application root
    pub temp_dir: TempDir,
    /// `<root>/modules`
    pub modules_dir: PathBuf,
}

impl ModuleTestFixture {
    /// Create a new fixture with an empty modules directory
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let modules_dir = temp_dir.path().join("modules");
        std::fs::create_dir_all(&modules_dir)?;
        Ok(Self {
            temp_dir,
            modules_dir,
        })
    }

    pub fn base_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Loader configuration rooted at the fixture
    pub fn config(&self) -> LoaderConfig {
        LoaderConfig {
            host_version: "1.8.0".to_string(),
            runtime_version: "1.82.0".to_string(),
            ..LoaderConfig::with_base_path(self.base_path())
        }
    }

    /// Context over the fixture config and `registry`
    pub fn context(&self, registry: EntryRegistry) -> LoaderContext {
        LoaderContext::new(self.config(), registry)
    }

    /// Create `modules/<name>` with a manifest and package metadata
    ///
    /// The entry is `<name>::Module` and the package exposes `<name>::`.
    pub fn create_module(&self, name: &str, version: &str, requires: Value) -> PathBuf {
        let dir = self.modules_dir.join(name);
        self.write_manifest(
            &dir,
            json!({
                "name": name,
                "version": version,
                "entry": entry_for(name),
                "requires": requires,
                "description": format!("Test module: {}", name),
            }),
        );
        self.write_package(&dir, name);
        dir
    }

    /// Write `module.json` into `dir`
    pub fn write_manifest(&self, dir: &Path, manifest: Value) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("module.json"), manifest.to_string()).unwrap();
    }

    /// Write `package.json` exposing the `<name>::` namespace from `src/`
    pub fn write_package(&self, dir: &Path, name: &str) {
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("src").join("bootstrap.rs"), "").unwrap();
        std::fs::write(
            dir.join("package.json"),
            json!({
                "name": format!("test/{}", name),
                "autoload": {
                    "psr-4": { format!("{}::", name): "src/" },
                    "files": ["src/bootstrap.rs"],
                },
            })
            .to_string(),
        )
        .unwrap();
    }

    /// Administratively enable `names`
    pub fn enable(&self, names: &[&str]) {
        let path = self.config().state_path();
        let mut state = AdminState::load(&path).unwrap();
        for name in names {
            state.enable(name);
        }
        state.save(&path).unwrap();
    }

    pub fn plan_path(&self) -> PathBuf {
        self.config().plan_path()
    }

    pub fn autoload_path(&self) -> PathBuf {
        self.config().autoload_path()
    }
}

/// Canonical entry identifier used by fixture modules
pub fn entry_for(name: &str) -> String {
    format!("{}::Module", name)
}

/// Registry with a [`RecordingModule`] constructor for each of `names`
pub fn recording_registry(names: &[&str], log: &EventLog) -> EntryRegistry {
    let mut registry = EntryRegistry::new();
    for name in names {
        let log = Arc::clone(log);
        registry.register(entry_for(name), move |root, manifest: &Manifest| {
            Box::new(RecordingModule {
                manifest: manifest.clone(),
                root,
                log: Arc::clone(&log),
            }) as Box<dyn Module>
        });
    }
    registry
}

/// Module that records every lifecycle call
pub struct RecordingModule {
    pub manifest: Manifest,
    pub root: PathBuf,
    pub log: EventLog,
}

impl Module for RecordingModule {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn register(&mut self, _app: &mut dyn Application) -> Result<(), ModuleError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("register:{}", self.manifest.name));
        Ok(())
    }

    fn boot(&mut self, app: &mut dyn Application) -> Result<(), ModuleError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("boot:{}@{}", self.manifest.name, app.version()));
        Ok(())
    }
}

/// Minimal host application
pub struct TestApp {
    pub version: String,
    pub base_path: PathBuf,
}

impl TestApp {
    pub fn new(base_path: &Path) -> Self {
        Self {
            version: "1.8.0".to_string(),
            base_path: base_path.to_path_buf(),
        }
    }
}

impl Application for TestApp {
    fn version(&self) -> &str {
        &self.version
    }

    fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Snapshot of the event log
pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
