// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! mimic CLI - inspect what the loader shim does with a bundler configuration

use clap::{Parser, Subcommand};
use mimic_core::{AliasResolver, Mimic, MimicOptions, VERSION};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "mimic",
    about = "Run bundler-configured modules on a plain module loader",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Options file (JSON); defaults to ./mimic.json, then the user config dir
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the specifier an aliased request is rewritten to
    Resolve {
        /// Module specifier as written in source
        specifier: String,
    },
    /// Run the first matching loader rule over a file and print the result
    Transform {
        /// File to transform
        file: PathBuf,
    },
    /// Load a file through the installed shim and print the compiled module
    Require {
        /// File to load
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "mimic=debug,mimic_core=debug"
    } else {
        "mimic=warn,mimic_core=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut options = load_options(cli.config.as_deref())?;
    options.apply_env();

    match cli.command {
        Command::Resolve { specifier } => {
            let aliases = options
                .bundler_config
                .map(|config| AliasResolver::new(config.resolve.alias))
                .unwrap_or_default();
            println!("{}", aliases.resolve(&specifier));
        }
        Command::Transform { file } => {
            let mimic = Mimic::new(options)?;
            let source = std::fs::read_to_string(&file)?;
            match mimic.rule_for(&file)? {
                Some(rule) => print!("{}", rule.transform.apply_to(&source, Some(&file))?),
                None => {
                    tracing::info!(file = %file.display(), "No loader rule matches");
                    print!("{}", source);
                }
            }
        }
        Command::Require { file } => {
            let mimic = Mimic::new(options)?;
            let cwd = std::env::current_dir()?;
            let target = std::path::absolute(&file)?;

            mimic.install();
            let loaded = mimic.host().require(&cwd.join("[mimic]"), &target.to_string_lossy());
            mimic.uninstall();

            let module = loaded?;
            println!("{} {}", "module".cyan().bold(), module.filename.display());
            if let Some(source) = &module.source {
                println!("{}", source);
            }
            println!(
                "{} {}",
                "exports".cyan().bold(),
                serde_json::to_string_pretty(&module.exports)?
            );
        }
    }

    Ok(())
}

/// `--config`, then `./mimic.json`, then `<config dir>/mimic/mimic.json`
fn load_options(explicit: Option<&Path>) -> anyhow::Result<MimicOptions> {
    if let Some(path) = explicit {
        return Ok(MimicOptions::from_file(path)?);
    }

    let candidates = std::iter::once(PathBuf::from("mimic.json"))
        .chain(dirs::config_dir().map(|dir| dir.join("mimic").join("mimic.json")));
    for candidate in candidates {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "Using options file");
            return Ok(MimicOptions::from_file(&candidate)?);
        }
    }

    Ok(MimicOptions::default())
}
