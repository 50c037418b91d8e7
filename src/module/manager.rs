//! Module manager
//!
//! Operator-facing operations on the module system: compile, enable,
//! disable, list and clear. Enabling or disabling a module re-runs the
//! compile so the plan always reflects the administrative state.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

use crate::module::compiler::{CompileReport, CompiledPlan};
use crate::module::context::LoaderContext;
use crate::module::registry::manifest::DEFAULT_VERSION;
use crate::module::registry::{AdminState, ModuleDiscovery};
use crate::module::traits::ModuleError;

/// Status shown by `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    /// Enabled and present in the last compiled plan
    Compiled,
    /// Enabled but not in the last compiled plan
    Pending,
    /// Not administratively enabled
    Disabled,
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListStatus::Compiled => "compiled",
            ListStatus::Pending => "pending",
            ListStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleListing {
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub compiled: bool,
    pub status: ListStatus,
}

/// Module manager
#[derive(Debug)]
pub struct ModuleManager {
    context: LoaderContext,
}

impl ModuleManager {
    pub fn new(context: LoaderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }

    /// Run a full compile
    pub fn compile(&self) -> Result<CompileReport, ModuleError> {
        self.context.compiler().compile()
    }

    /// Administratively enable a discovered module and re-compile
    pub fn enable(&self, name: &str) -> Result<CompileReport, ModuleError> {
        self.ensure_discovered(name)?;
        let path = self.context.config().state_path();
        let mut state = AdminState::load(&path)?;
        if state.enable(name) {
            state.save(&path)?;
        } else {
            info!("Module {} is already enabled", name);
        }
        self.compile()
    }

    /// Administratively disable a discovered module and re-compile
    pub fn disable(&self, name: &str) -> Result<CompileReport, ModuleError> {
        self.ensure_discovered(name)?;
        let path = self.context.config().state_path();
        let mut state = AdminState::load(&path)?;
        if state.disable(name) {
            state.save(&path)?;
        } else {
            info!("Module {} is already disabled", name);
        }
        self.compile()
    }

    /// Cross-reference discovery, administrative state and the last plan
    pub fn list(&self) -> Result<Vec<ModuleListing>, ModuleError> {
        let config = self.context.config();
        let discovered = ModuleDiscovery::new(config).discover()?;
        let state = AdminState::load(config.state_path())?;
        let compiled: BTreeSet<String> = match CompiledPlan::read(&config.plan_path())? {
            Some(plan) => plan.names().into_iter().collect(),
            None => BTreeSet::new(),
        };

        let rows = discovered
            .iter()
            .map(|(name, raw)| {
                let enabled = state.is_enabled(name);
                let in_plan = compiled.contains(name);
                let status = match (enabled, in_plan) {
                    (false, _) => ListStatus::Disabled,
                    (true, true) => ListStatus::Compiled,
                    (true, false) => ListStatus::Pending,
                };
                ModuleListing {
                    name: name.clone(),
                    version: raw
                        .get("version")
                        .and_then(|v| v.as_str())
                        .unwrap_or(DEFAULT_VERSION)
                        .to_string(),
                    enabled,
                    compiled: in_plan,
                    status,
                }
            })
            .collect();

        Ok(rows)
    }

    /// Remove the compiled plan and lookup table
    ///
    /// Returns the number of files removed. The loader then runs without
    /// modules until the next compile.
    pub fn clear(&self) -> Result<usize, ModuleError> {
        let config = self.context.config();
        let mut removed = 0;

        for path in [config.plan_path(), config.autoload_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Removed {:?}", path);
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove {:?}: {}", path, e);
                    return Err(ModuleError::OperationError(format!(
                        "Failed to remove {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Ok(removed)
    }

    fn ensure_discovered(&self, name: &str) -> Result<(), ModuleError> {
        let discovered = ModuleDiscovery::new(self.context.config()).discover()?;
        if discovered.contains_key(name) {
            Ok(())
        } else {
            Err(ModuleError::ModuleNotFound(name.to_string()))
        }
    }
}
