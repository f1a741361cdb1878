//! # cbake CLI Entry Point
//!
//! Parses CLI arguments using clap and routes commands to the handlers in
//! [`cbake::commands`].
//!
//! ## Commands
//!
//! - `build` - compile the projects of `cbake.toml`
//! - `dump` - print every project and its properties
//! - `deps` - list the dependencies in a `.d` file or `/showIncludes` output
//! - `cache` - show or clean the incremental cache

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use cbake::commands;
use cbake::config::CONFIG_FILE;
use cbake::logging::{LogConfig, init_logging};
use cbake::toolchain::ToolchainFamily;

#[derive(Parser)]
#[command(name = "cbake")]
#[command(about = "Describe C/C++ projects, compile them incrementally", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug logs (incremental decisions, compiler commands)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile projects
    Build {
        /// Path to the config file
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
        /// Only this project [default: all]
        #[arg(long)]
        project: Option<String>,
        /// Toolchain family (gcc or msvc)
        #[arg(long)]
        toolchain: Option<ToolchainFamily>,
        /// Ignore the incremental cache and compile everything
        #[arg(long)]
        no_incremental: bool,
    },
    /// Print every project and its properties
    Dump {
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the dependencies recorded by a compiler
    Deps {
        /// `.d` file (gcc) or captured stdout (msvc)
        file: PathBuf,
        /// Input format (gcc or msvc)
        #[arg(long, default_value = "gcc")]
        format: ToolchainFamily,
    },
    /// Inspect or clean the incremental cache
    Cache {
        #[command(subcommand)]
        op: CacheOp,
    },
}

#[derive(Subcommand)]
enum CacheOp {
    /// Show the cache directory of each project
    Path {
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        toolchain: Option<ToolchainFamily>,
    },
    /// Delete cached records, forcing a full rebuild
    Clean {
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        toolchain: Option<ToolchainFamily>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LogConfig::from_env().with_verbose(cli.verbose)) {
        eprintln!("{} Failed to initialize logging: {}", "!".yellow(), e);
    }

    match &cli.command {
        Commands::Build {
            config,
            project,
            toolchain,
            no_incremental,
        } => commands::build::handle_build(&commands::build::BuildOptions {
            config: config.clone(),
            project: project.clone(),
            toolchain: *toolchain,
            no_incremental: *no_incremental,
        }),

        Commands::Dump { config, json } => commands::inspect::handle_dump(config, *json),

        Commands::Deps { file, format } => commands::inspect::handle_deps(file, *format),

        Commands::Cache { op } => match op {
            CacheOp::Path {
                config,
                project,
                toolchain,
            } => commands::cache::handle_path(config, project.as_deref(), *toolchain),
            CacheOp::Clean {
                config,
                project,
                toolchain,
            } => commands::cache::handle_clean(config, project.as_deref(), *toolchain),
        },
    }
}
