//! Incremental cache command handlers

use anyhow::{Context as _, Result};
use colored::*;
use std::path::Path;

use crate::incremental;
use crate::toolchain::ToolchainFamily;
use crate::ui;

/// `cbake cache path`: where each project keeps its records.
pub fn handle_path(
    config: &Path,
    project: Option<&str>,
    toolchain: Option<ToolchainFamily>,
) -> Result<()> {
    let (config, _) = super::load_context(config)?;
    let toolchain = config.toolchain(toolchain);

    let mut table = ui::Table::new(&["Project", "Cache directory"]);
    for name in super::selected_projects(&config, project) {
        let dir = incremental::cache_dir(&toolchain, &name);
        table.add_row(vec![name.bold().to_string(), dir.display().to_string()]);
    }
    table.print();
    Ok(())
}

/// `cbake cache clean`: forgets every record, forcing a full rebuild.
pub fn handle_clean(
    config: &Path,
    project: Option<&str>,
    toolchain: Option<ToolchainFamily>,
) -> Result<()> {
    let (config, ctx) = super::load_context(config)?;
    let toolchain = config.toolchain(toolchain);

    for name in super::selected_projects(&config, project) {
        ctx.project_by_name(&name)?;
        let removed = incremental::delete_cache(&toolchain, &name)
            .with_context(|| format!("Failed to clean cache of '{name}'"))?;
        println!(
            "{} {}: removed {} cache file(s)",
            "✓".green(),
            name.bold(),
            removed
        );
    }
    Ok(())
}
