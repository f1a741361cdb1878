//! `cbake.toml` parsing.
//!
//! ```toml
//! [build]
//! toolchain = "gcc"
//!
//! [[project]]
//! name = "app"
//! binary_type = "exe"
//! files = ["src/main.c"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CbError, Result};
use crate::project::{Context, keys};
use crate::toolchain::{Toolchain, ToolchainFamily, default_toolchain};

pub const CONFIG_FILE: &str = "cbake.toml";

const SOURCE_EXTENSIONS: [&str; 4] = ["c", "cpp", "cc", "cxx"];

#[derive(Deserialize, Debug, Default)]
pub struct BuildConfig {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectConfig>,
    /// Directory of the config file.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Deserialize, Debug)]
pub struct BuildSection {
    pub toolchain: Option<ToolchainFamily>,
    /// Compiler executable override.
    pub compiler: Option<String>,
    #[serde(default = "default_true")]
    pub incremental: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            toolchain: None,
            compiler: None,
            incremental: true,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_binary_type")]
    pub binary_type: String,
    pub target_name: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Directories searched recursively for C/C++ sources.
    #[serde(default)]
    pub source_dirs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub cxflags: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub cxxflags: Vec<String>,
    #[serde(default)]
    pub include_dir: Vec<String>,
    #[serde(default)]
    pub link_project: Vec<String>,
    #[serde(default)]
    pub lflags: Vec<String>,
    pub output_dir: Option<String>,
    pub working_directory: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_binary_type() -> String {
    keys::EXE.to_string()
}

pub fn load_config(path: &Path) -> Result<BuildConfig> {
    if !path.exists() {
        return Err(CbError::Config {
            path: path.to_path_buf(),
            reason: format!("file not found. Tip: create a {CONFIG_FILE} with a [[project]] table"),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| CbError::io(path, e))?;
    let mut config = BuildConfig::parse(&text).map_err(|e| CbError::Config {
        path: path.to_path_buf(),
        reason: format!("check for syntax errors (missing quotes, brackets): {e}"),
    })?;
    config.root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(config)
}

impl BuildConfig {
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut config: BuildConfig = toml::from_str(text)?;
        config.root = PathBuf::from(".");
        Ok(config)
    }

    /// The configured toolchain, `family` taking precedence.
    pub fn toolchain(&self, family: Option<ToolchainFamily>) -> Toolchain {
        let mut toolchain = match family.or(self.build.toolchain) {
            Some(family) => Toolchain::new(family),
            None => default_toolchain(),
        };
        if let Some(compiler) = &self.build.compiler {
            toolchain = toolchain.with_compiler(compiler.clone());
        }
        let base = self.root.join(&toolchain.default_directory_base);
        toolchain.with_directory_base(base)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Declares every project of the file in `ctx`.
    pub fn apply(&self, ctx: &mut Context) -> Result<()> {
        for project in &self.projects {
            ctx.project(&project.name);
            ctx.set(keys::BINARY_TYPE, &project.binary_type)?;
            if let Some(target) = &project.target_name {
                ctx.set(keys::TARGET_NAME, target)?;
            }

            for file in &project.files {
                ctx.add_file(self.resolve(file))?;
            }
            for dir in &project.source_dirs {
                for file in self.collect_sources(&self.resolve(dir))? {
                    ctx.add_file(file)?;
                }
            }

            for value in &project.defines {
                ctx.add(keys::DEFINES, value)?;
            }
            for value in &project.cxflags {
                ctx.add(keys::CXFLAGS, value)?;
            }
            for value in &project.cflags {
                ctx.add(keys::CFLAGS, value)?;
            }
            for value in &project.cxxflags {
                ctx.add(keys::CXXFLAGS, value)?;
            }
            for dir in &project.include_dir {
                ctx.add(keys::INCLUDE_DIR, &self.absolute(dir)?)?;
            }
            for value in &project.link_project {
                ctx.add(keys::LINK_PROJECT, value)?;
            }
            for value in &project.lflags {
                ctx.add(keys::LFLAGS, value)?;
            }
            if let Some(dir) = &project.output_dir {
                ctx.set(keys::OUTPUT_DIR, &self.absolute(dir)?)?;
            }
            if let Some(dir) = &project.working_directory {
                ctx.set(keys::WORKING_DIRECTORY, &self.absolute(dir)?)?;
            }
        }
        Ok(())
    }

    fn absolute(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path);
        let absolute = std::path::absolute(&resolved).map_err(|e| CbError::io(&resolved, e))?;
        Ok(absolute.to_string_lossy().into_owned())
    }

    fn collect_sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| CbError::io(dir, std::io::Error::other(e)))?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = path.extension()
                && SOURCE_EXTENSIONS.contains(&ext.to_string_lossy().as_ref())
            {
                sources.push(path.to_path_buf());
            }
        }
        sources.sort();
        Ok(sources)
    }
}
