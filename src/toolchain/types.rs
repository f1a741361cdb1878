use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::CbError;
use crate::project::Project;

/// Supported compiler families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainFamily {
    /// Microsoft Visual C++ (cl.exe)
    Msvc,
    /// GNU Compiler Collection
    Gcc,
}

impl ToolchainFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ToolchainFamily::Msvc => "msvc",
            ToolchainFamily::Gcc => "gcc",
        }
    }

    /// Default compiler executable.
    pub fn compiler(&self) -> &'static str {
        match self {
            ToolchainFamily::Msvc => "cl",
            ToolchainFamily::Gcc => "gcc",
        }
    }
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolchainFamily {
    type Err = CbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msvc" | "cl" => Ok(ToolchainFamily::Msvc),
            "gcc" => Ok(ToolchainFamily::Gcc),
            _ => Err(CbError::UnknownToolchain(s.to_string())),
        }
    }
}

/// A compiler family plus where it puts its outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub family: ToolchainFamily,

    /// Compiler executable (`cl`, `gcc`, or a user override)
    pub compiler: String,

    /// Root for objects, artifacts and the incremental cache
    pub default_directory_base: PathBuf,
}

impl Toolchain {
    pub fn new(family: ToolchainFamily) -> Self {
        Self {
            family,
            compiler: family.compiler().to_string(),
            default_directory_base: Path::new(".build").join(family.name()),
        }
    }

    pub fn msvc() -> Self {
        Self::new(ToolchainFamily::Msvc)
    }

    pub fn gcc() -> Self {
        Self::new(ToolchainFamily::Gcc)
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_directory_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.default_directory_base = base.into();
        self
    }

    /// Argument that makes the compiler report header dependencies.
    pub fn extra_argument(&self) -> &'static str {
        match self.family {
            ToolchainFamily::Msvc => "/showIncludes",
            ToolchainFamily::Gcc => "-MMD",
        }
    }

    pub fn object_extension(&self) -> &'static str {
        match self.family {
            ToolchainFamily::Msvc => "obj",
            ToolchainFamily::Gcc => "o",
        }
    }

    /// File name of the artifact `project` produces.
    pub fn artifact_name(&self, project: &Project) -> String {
        let name = project.target_name();
        match self.family {
            ToolchainFamily::Msvc => {
                if project.is_shared_library() {
                    format!("{name}.dll")
                } else if project.is_static_library() {
                    format!("{name}.lib")
                } else {
                    format!("{name}.exe")
                }
            }
            ToolchainFamily::Gcc => {
                if project.is_shared_library() {
                    format!("lib{name}.so")
                } else if project.is_static_library() {
                    format!("lib{name}.a")
                } else {
                    name.to_string()
                }
            }
        }
    }

    /// `output_dir` when set, `<default_directory_base>/<project>/` otherwise.
    pub fn output_dir(&self, project: &Project) -> PathBuf {
        match project.property(crate::project::keys::OUTPUT_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => self.default_directory_base.join(project.name()),
        }
    }

    pub fn artifact_path(&self, project: &Project) -> PathBuf {
        self.output_dir(project).join(self.artifact_name(project))
    }

    pub fn artifact_exists(&self, project: &Project) -> bool {
        self.artifact_path(project).is_file()
    }
}
