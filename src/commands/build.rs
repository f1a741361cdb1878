//! Build command handler
//!
//! Handles `cbake build`: compiles each selected project, skipping files
//! the incremental cache vouches for.

use anyhow::{Context as _, Result};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::bake::{Baker, ProcessCompiler};
use crate::incremental::IncrementalBuild;
use crate::toolchain::{ToolchainFamily, compiler_available};

#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub config: PathBuf,
    pub project: Option<String>,
    pub toolchain: Option<ToolchainFamily>,
    pub no_incremental: bool,
}

pub fn handle_build(opts: &BuildOptions) -> Result<()> {
    let start_time = Instant::now();
    let (config, ctx) = super::load_context(&opts.config)?;
    let toolchain = config.toolchain(opts.toolchain);

    if !compiler_available(&toolchain) {
        println!(
            "{} Compiler '{}' could not be launched; is it on PATH?",
            "!".yellow(),
            toolchain.compiler
        );
    }

    let incremental = config.build.incremental && !opts.no_incremental;
    let mut baker = Baker::new(toolchain).with_progress(true);
    if incremental {
        baker = baker.with_plugin(IncrementalBuild::new());
    }

    let projects = super::selected_projects(&config, opts.project.as_deref());
    if projects.is_empty() {
        println!("{} No projects declared in {}", "!".yellow(), opts.config.display());
        return Ok(());
    }

    let mut compiler = ProcessCompiler;
    for name in &projects {
        let report = baker
            .bake(&ctx, name, &mut compiler)
            .with_context(|| format!("Failed to build project '{name}'"))?;

        if report.is_up_to_date() {
            println!("{} {} up to date", "⚡".green(), report.project.bold());
        } else {
            println!(
                "{} {}: {} compiled, {} up to date",
                "✓".green(),
                report.project.bold(),
                report.compiled.len(),
                report.skipped.len()
            );
        }
    }

    println!(
        "{} Build finished in {:.2?} ({})",
        "✓".green(),
        start_time.elapsed(),
        baker.toolchain().family
    );
    Ok(())
}
