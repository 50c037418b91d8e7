//! modkit command line tool
//!
//! Standalone operator tool: compiles and manages modules without a host
//! application, so entry points are only checked against the namespaces
//! the modules' package metadata exposes.
//!
//! Usage:
//!   modkit [--config modkit.toml] [--base-path DIR] compile|enable <module>|disable <module>|list|clear

use clap::Parser;
use modkit::cli::{self, Cli};
use modkit::utils::init_logging_from_config;
use modkit::EntryRegistry;

fn main() {
    let cli = Cli::parse();

    let mut config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    };
    init_logging_from_config(&config.logging);

    // No host here, so there are no constructors to check
    config.require_factory = false;

    let stdout = std::io::stdout();
    let code = cli::execute(&cli.command, config, EntryRegistry::new(), &mut stdout.lock());
    std::process::exit(code);
}
