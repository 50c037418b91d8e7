//! Command line interface
//!
//! `modkit compile | enable <module> | disable <module> | list | clear`.
//! Output goes to the supplied writer; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LoaderConfig;
use crate::module::{CompileReport, EntryRegistry, LoaderContext, ModuleError, ModuleManager};

/// Config files picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILES: &[&str] = &["modkit.toml", "modkit.json"];

#[derive(Parser, Debug)]
#[command(name = "modkit", version, about = "Compile and manage application modules")]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Override the configured base path
    #[arg(long)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Discover, validate and resolve modules, then write the compiled plan
    Compile,
    /// Enable a module and re-compile
    Enable { module: String },
    /// Disable a module and re-compile
    Disable { module: String },
    /// Show discovered modules with their enabled and compiled status
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remove the compiled plan and lookup table
    Clear,
}

/// Load the configuration selected by the command line
pub fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file()),
    };

    let mut config = match path {
        Some(path) => LoaderConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    if let Some(base_path) = &cli.base_path {
        config.base_path = base_path.to_string_lossy().to_string();
    }
    Ok(config)
}

/// Load the configuration, run the command and return the exit code
pub fn run<W: Write>(cli: &Cli, registry: EntryRegistry, out: &mut W) -> i32 {
    match load_config(cli) {
        Ok(config) => execute(&cli.command, config, registry, out),
        Err(e) => {
            let _ = writeln!(out, "error: {:#}", e);
            1
        }
    }
}

/// Run `command` against `config`; 0 on success, 1 on failure
pub fn execute<W: Write>(
    command: &Command,
    config: LoaderConfig,
    registry: EntryRegistry,
    out: &mut W,
) -> i32 {
    let manager = ModuleManager::new(LoaderContext::new(config, registry));
    match dispatch(command, &manager, out) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            let _ = writeln!(out, "error: {:#}", e);
            1
        }
    }
}

fn dispatch<W: Write>(command: &Command, manager: &ModuleManager, out: &mut W) -> anyhow::Result<bool> {
    match command {
        Command::Compile => report(manager.compile()?, out),
        Command::Enable { module } => match manager.enable(module) {
            Ok(compiled) => {
                writeln!(out, "Enabled {}", module)?;
                report(compiled, out)
            }
            Err(ModuleError::ModuleNotFound(name)) => {
                writeln!(out, "Unknown module: {}", name)?;
                Ok(false)
            }
            Err(e) => Err(e).context("enable failed"),
        },
        Command::Disable { module } => match manager.disable(module) {
            Ok(compiled) => {
                writeln!(out, "Disabled {}", module)?;
                report(compiled, out)
            }
            Err(ModuleError::ModuleNotFound(name)) => {
                writeln!(out, "Unknown module: {}", name)?;
                Ok(false)
            }
            Err(e) => Err(e).context("disable failed"),
        },
        Command::List { json } => {
            let rows = manager.list()?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
            } else if rows.is_empty() {
                writeln!(out, "No modules discovered")?;
            } else {
                writeln!(out, "{:<24} {:<12} {}", "NAME", "VERSION", "STATUS")?;
                for row in rows {
                    writeln!(out, "{:<24} {:<12} {}", row.name, row.version, row.status)?;
                }
            }
            Ok(true)
        }
        Command::Clear => {
            let removed = manager.clear()?;
            let plan = manager.context().config().plan_path();
            writeln!(
                out,
                "Cleared {} compiled file(s) ({})",
                removed,
                plan.parent().unwrap_or(Path::new(".")).display()
            )?;
            Ok(true)
        }
    }
}

fn report<W: Write>(report: CompileReport, out: &mut W) -> anyhow::Result<bool> {
    write!(out, "{}", report)?;
    Ok(report.is_success())
}
