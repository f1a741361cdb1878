//! CLI command handlers
//!
//! Each handler loads `cbake.toml`, builds a [`Context`](crate::project::Context)
//! from it and reports to the terminal.

pub mod build;
pub mod cache;
pub mod inspect;

use anyhow::{Context as _, Result};
use std::path::Path;

use crate::config::{self, BuildConfig};
use crate::project::Context;

/// Loads the config file and declares its projects.
pub fn load_context(path: &Path) -> Result<(BuildConfig, Context)> {
    let config = config::load_config(path)?;
    let mut ctx = Context::new();
    config
        .apply(&mut ctx)
        .with_context(|| format!("Failed to declare projects from {}", path.display()))?;
    Ok((config, ctx))
}

/// `name` when given, every declared project otherwise.
pub fn selected_projects(config: &BuildConfig, name: Option<&str>) -> Vec<String> {
    match name {
        Some(name) => vec![name.to_string()],
        None => config.projects.iter().map(|p| p.name.clone()).collect(),
    }
}
