//! Module compiler
//!
//! Discover, intersect with the administrative state, validate, resolve,
//! then write the compiled plan and lookup table and verify that every
//! entry point resolves. Nothing is written unless every enabled module
//! validates and the dependency graph is acyclic.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::module::compiler::plan::CompiledPlan;
use crate::module::context::LoaderContext;
use crate::module::loader::autoload::{ClassLoader, LookupTable, PackageMetadata};
use crate::module::registry::{
    AdminState, Manifest, ModuleDependencies, ModuleDiscovery, RawManifest,
};
use crate::module::traits::ModuleError;
use crate::module::validation::ManifestValidator;

/// Per-module compile status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Validated (and, on success, compiled)
    Ok,
    /// Failed validation or verification
    Fail(Vec<String>),
    /// Discovered but not administratively enabled
    Skip,
}

/// Overall compile outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Plan and lookup table written and verified
    Compiled,
    /// At least one module has issues; nothing written
    ValidationFailed,
    /// The dependency graph has a cycle; nothing written
    CycleDetected(String),
    /// Artifacts written but some entry point does not resolve
    VerificationFailed,
}

/// One report line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub name: String,
    pub status: ModuleStatus,
}

/// Result of a compile run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub outcome: CompileOutcome,
    /// Per-module statuses, sorted by name
    pub modules: Vec<ModuleReport>,
    /// Compiled module names in load order (empty unless artifacts were written)
    pub load_order: Vec<String>,
}

impl CompileReport {
    fn new(statuses: BTreeMap<String, ModuleStatus>, outcome: CompileOutcome) -> Self {
        Self {
            outcome,
            modules: statuses
                .into_iter()
                .map(|(name, status)| ModuleReport { name, status })
                .collect(),
            load_order: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CompileOutcome::Compiled
    }

    /// Status of one module
    pub fn status(&self, name: &str) -> Option<&ModuleStatus> {
        self.modules.iter().find(|m| m.name == name).map(|m| &m.status)
    }

    /// Operator-facing lines: `[OK]`, `[FAIL]` (one per issue), `[SKIP]`
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for module in &self.modules {
            match &module.status {
                ModuleStatus::Ok => lines.push(format!("[OK] {}", module.name)),
                ModuleStatus::Skip => {
                    lines.push(format!("[SKIP] {} (not enabled)", module.name))
                }
                ModuleStatus::Fail(issues) => {
                    lines.push(format!("[FAIL] {}", module.name));
                    lines.extend(issues.iter().map(|issue| format!("  - {}", issue)));
                }
            }
        }
        match &self.outcome {
            CompileOutcome::Compiled => lines.push(format!(
                "Compiled {} module(s): {}",
                self.load_order.len(),
                self.load_order.join(", ")
            )),
            CompileOutcome::ValidationFailed => {
                lines.push("Compile failed: validation issues, nothing written".to_string())
            }
            CompileOutcome::CycleDetected(cycle) => lines.push(format!(
                "Compile failed: circular dependency {}, nothing written",
                cycle
            )),
            CompileOutcome::VerificationFailed => lines.push(
                "Compile failed: unresolvable entry points, fix the modules and re-run"
                    .to_string(),
            ),
        }
        lines
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Module compiler
pub struct ModuleCompiler<'a> {
    context: &'a LoaderContext,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(context: &'a LoaderContext) -> Self {
        Self { context }
    }

    /// Run a full compile
    pub fn compile(&self) -> Result<CompileReport, ModuleError> {
        let config = self.context.config();
        info!("Compiling modules under {}", config.base_path);

        let discovered = ModuleDiscovery::new(config).discover()?;
        let state = AdminState::load(config.state_path())?;

        for name in &state.enabled {
            if !discovered.contains_key(name) {
                warn!("Module {} is enabled but was not discovered", name);
            }
        }

        let mut statuses = BTreeMap::new();
        let mut enabled: BTreeMap<String, RawManifest> = BTreeMap::new();
        for (name, raw) in discovered {
            if state.is_enabled(&name) {
                enabled.insert(name, raw);
            } else {
                debug!("Skipping module {} (not enabled)", name);
                statuses.insert(name, ModuleStatus::Skip);
            }
        }

        // Validate every enabled module against the whole enabled set
        let validator = ManifestValidator::from_config(config).with_loaded(enabled.keys().cloned());
        let mut manifests = Vec::with_capacity(enabled.len());
        let mut valid = true;
        for (name, raw) in &enabled {
            let mut issues = validator.validate(name, raw, &enabled);
            match Manifest::normalize(name, raw, true) {
                Ok(manifest) => manifests.push(manifest),
                // A missing entry is already an issue
                Err(e) if has_entry(raw) => issues.push(e.to_string()),
                Err(_) => {}
            }

            if issues.is_empty() {
                statuses.insert(name.clone(), ModuleStatus::Ok);
            } else {
                valid = false;
                statuses.insert(name.clone(), ModuleStatus::Fail(issues));
            }
        }

        if !valid {
            warn!("Compile aborted: validation failed");
            return Ok(CompileReport::new(statuses, CompileOutcome::ValidationFailed));
        }

        let order = match ModuleDependencies::resolve_order(&manifests) {
            Ok(order) => order,
            Err(ModuleError::CircularDependency(cycle)) => {
                warn!("Compile aborted: circular dependency {}", cycle);
                return Ok(CompileReport::new(
                    statuses,
                    CompileOutcome::CycleDetected(cycle),
                ));
            }
            Err(e) => return Err(e),
        };

        let mut by_name: BTreeMap<String, Manifest> = manifests
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        let ordered: Vec<Manifest> = order
            .iter()
            .filter_map(|name| by_name.remove(name))
            .collect();

        let plan_path = config.plan_path();
        CompiledPlan::new(&config.host_version, &ordered).write(&plan_path)?;
        info!("Wrote compiled plan with {} module(s) to {:?}", ordered.len(), plan_path);

        let autoload_path = config.autoload_path();
        let (table, owned) = self.lookup_table(&ordered);
        table.write(&autoload_path)?;
        info!("Wrote lookup table to {:?}", autoload_path);

        let failures = self.verify(&ordered, &owned, &autoload_path)?;
        let outcome = if failures.is_empty() {
            CompileOutcome::Compiled
        } else {
            warn!("Compile verification failed for {} module(s)", failures.len());
            CompileOutcome::VerificationFailed
        };
        for (name, issue) in failures {
            statuses.insert(name, ModuleStatus::Fail(vec![issue]));
        }

        let mut report = CompileReport::new(statuses, outcome);
        report.load_order = order;
        Ok(report)
    }

    /// Derive the lookup table from each module's package metadata
    ///
    /// Also returns, per module name, a class loader over the prefixes that
    /// module's own metadata declares.
    fn lookup_table(&self, ordered: &[Manifest]) -> (LookupTable, BTreeMap<String, ClassLoader>) {
        let package_file = &self.context.config().package_file;
        let mut table = LookupTable::default();
        let mut owned = BTreeMap::new();

        for manifest in ordered {
            let root = Path::new(&manifest.path);
            match PackageMetadata::read(root, package_file) {
                Ok(Some(metadata)) => {
                    table.add_package(root, &metadata.autoload);
                    let mut own = ClassLoader::new();
                    for (prefix, dir) in &metadata.autoload.prefixes {
                        own.add_prefix(prefix, root.join(dir));
                    }
                    owned.insert(manifest.name.clone(), own);
                }
                Ok(None) => debug!("Module {} has no {}", manifest.name, package_file),
                Err(e) => warn!(
                    "Ignoring package metadata of module {}: {}",
                    manifest.name, e
                ),
            }
        }

        (table, owned)
    }

    /// Resolve every entry through the table just written
    ///
    /// An entry must also fall under a namespace its own module declares.
    fn verify(
        &self,
        ordered: &[Manifest],
        owned: &BTreeMap<String, ClassLoader>,
        autoload_path: &Path,
    ) -> Result<Vec<(String, String)>, ModuleError> {
        let table = LookupTable::read(autoload_path)?.unwrap_or_default();
        let mut class_loader = ClassLoader::new();
        class_loader.register(&table);

        let require_factory = self.context.config().require_factory;
        let registry = self.context.registry();
        let mut failures = Vec::new();

        for manifest in ordered {
            let entry = &manifest.entry;
            let owns_entry = owned
                .get(&manifest.name)
                .is_some_and(|own| own.locate(entry).is_some());
            let issue = if !owns_entry {
                Some(format!(
                    "Entry point {} is not exposed by the module's own package metadata",
                    entry
                ))
            } else if class_loader.locate(entry).is_none() {
                Some(format!("Entry point {} is missing from the lookup table", entry))
            } else if require_factory && class_loader.resolve(entry, registry).is_none() {
                Some(format!("Entry point {} has no registered constructor", entry))
            } else {
                None
            };

            match issue {
                Some(issue) => failures.push((manifest.name.clone(), issue)),
                None => debug!("Verified entry point {} of module {}", entry, manifest.name),
            }
        }

        Ok(failures)
    }
}

fn has_entry(raw: &RawManifest) -> bool {
    raw.get("entry")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.trim().is_empty())
}
