//! Dump and dependency inspection handlers

use anyhow::{Context as _, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::deps::{self, MsvcDepParser};
use crate::toolchain::ToolchainFamily;
use crate::ui;

/// `cbake dump`: every project and its properties.
pub fn handle_dump(config: &Path, json: bool) -> Result<()> {
    let (_, ctx) = super::load_context(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ctx.dump_json())?);
        return Ok(());
    }
    if ctx.is_empty() {
        println!("{} No projects declared", "!".yellow());
        return Ok(());
    }
    print!("{}", ctx.dump());
    Ok(())
}

/// Dependencies listed in a `.d` file (gcc) or captured `/showIncludes`
/// output (msvc).
pub fn list_dependencies(file: &Path, format: ToolchainFamily) -> Result<Vec<String>> {
    match format {
        ToolchainFamily::Gcc => deps::read_gcc_depfile(file)
            .with_context(|| format!("Failed to read {}", file.display())),
        ToolchainFamily::Msvc => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Ok(MsvcDepParser::new(&text).map(str::to_string).collect())
        }
    }
}

/// `cbake deps <file>`
pub fn handle_deps(file: &Path, format: ToolchainFamily) -> Result<()> {
    let dependencies = list_dependencies(file, format)?;
    if dependencies.is_empty() {
        println!("{} No dependencies found in {}", "!".yellow(), file.display());
        return Ok(());
    }

    let mut table = ui::Table::new(&["#", "Dependency"]);
    for (i, dep) in dependencies.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), dep.clone()]);
    }
    table.print();
    Ok(())
}
