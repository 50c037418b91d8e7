//! Runtime module loader
//!
//! Reads the compiled plan on process start and brings the modules up in
//! the recorded order. Nothing is re-discovered or re-validated here.

use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::module::compiler::CompiledPlan;
use crate::module::context::LoaderContext;
use crate::module::loader::autoload::{ClassLoader, LookupTable};
use crate::module::traits::{Application, Module, ModuleError, ModuleState};

/// Runtime loader for one process
pub struct ModuleLoader<'a> {
    context: &'a LoaderContext,
    state: ModuleState,
    class_loader: ClassLoader,
    /// Loaded modules in load order
    modules: Vec<Box<dyn Module>>,
    /// Cause of the failure that put the loader in `Failed`
    failure: Option<String>,
}

impl<'a> ModuleLoader<'a> {
    pub fn new(context: &'a LoaderContext) -> Self {
        Self {
            context,
            state: ModuleState::Idle,
            class_loader: ClassLoader::new(),
            modules: Vec::new(),
            failure: None,
        }
    }

    /// Load the compiled plan and register every module with `app`
    ///
    /// Without a compiled plan this is a no-op and the loader stays idle.
    /// Any entry that cannot be resolved aborts loading, and every later
    /// `load` or `boot` call reports the same failure.
    pub fn load(&mut self, app: &mut dyn Application) -> Result<(), ModuleError> {
        match self.state {
            ModuleState::Idle => {}
            ModuleState::Failed => return Err(self.failed()),
            _ => {
                debug!("Modules already loaded, ignoring load request");
                return Ok(());
            }
        }

        let result = self.load_plan(app);
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    fn load_plan(&mut self, app: &mut dyn Application) -> Result<(), ModuleError> {
        let config = self.context.config();
        self.state = ModuleState::DiscoveringPlan;

        let Some(plan) = CompiledPlan::read(&config.plan_path())? else {
            info!("No compiled module plan, running without modules");
            self.state = ModuleState::Idle;
            return Ok(());
        };
        let entries = plan.entries()?;
        self.state = ModuleState::PlanFound;

        if let Some(table) = LookupTable::read(&config.autoload_path())? {
            self.class_loader.register(&table);
        }
        self.state = ModuleState::AutoloadRegistered;

        let registry = self.context.registry();
        let mut modules = Vec::with_capacity(entries.len());
        for entry in entries {
            let manifest = entry.manifest;
            if !manifest.enabled {
                debug!("Module {} is disabled in the plan, skipping", manifest.name);
                continue;
            }

            let factory = self
                .class_loader
                .resolve(&manifest.entry, registry)
                .ok_or_else(|| ModuleError::EntryNotFound {
                    module: manifest.name.clone(),
                    entry: manifest.entry.clone(),
                })?;

            debug!("Instantiating module {} ({})", manifest.name, manifest.entry);
            modules.push(factory(PathBuf::from(&manifest.path), &manifest));
        }
        self.modules = modules;
        self.state = ModuleState::ModulesInstantiated;

        for module in &mut self.modules {
            debug!("Registering module {}", module.name());
            module.register(app)?;
        }
        self.state = ModuleState::Registered;

        info!("Loaded {} module(s)", self.modules.len());
        Ok(())
    }

    /// Drop everything loaded so far and remember the cause
    fn fail(&mut self, cause: &ModuleError) {
        error!("Module loading failed in state {:?}: {}", self.state, cause);
        self.modules.clear();
        self.class_loader = ClassLoader::new();
        self.failure = Some(cause.to_string());
        self.state = ModuleState::Failed;
    }

    fn failed(&self) -> ModuleError {
        ModuleError::InitializationError(format!(
            "module loading already failed: {}",
            self.failure.as_deref().unwrap_or("unknown cause")
        ))
    }

    /// Boot every loaded module in load order; later calls are no-ops
    pub fn boot(&mut self, app: &mut dyn Application) -> Result<(), ModuleError> {
        match self.state {
            ModuleState::Registered => {}
            ModuleState::Failed => return Err(self.failed()),
            _ => {
                debug!("Boot skipped in state {:?}", self.state);
                return Ok(());
            }
        }

        let mut booted = Ok(());
        for module in &mut self.modules {
            debug!("Booting module {}", module.name());
            booted = module.boot(app);
            if booted.is_err() {
                break;
            }
        }
        if let Err(e) = booted {
            self.fail(&e);
            return Err(e);
        }
        self.state = ModuleState::Booted;

        info!("Booted {} module(s)", self.modules.len());
        Ok(())
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Loaded module by name
    pub fn get(&self, name: &str) -> Option<&dyn Module> {
        self.modules
            .iter()
            .find(|m| m.name() == name)
            .map(|m| &**m)
    }

    /// Loaded module names in load order
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered bootstrap files
    pub fn bootstrap_files(&self) -> &[PathBuf] {
        self.class_loader.files()
    }
}
