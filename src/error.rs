//! Error types for the library surface.

use std::path::PathBuf;

/// Errors returned by configuration, context and bake operations.
///
/// Cache and dependency problems never show up here: the incremental layer
/// swallows them and recompiles instead.
#[derive(Debug, thiserror::Error)]
pub enum CbError {
    /// The config file could not be read or parsed.
    #[error("config error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown project '{0}'")]
    UnknownProject(String),

    /// A property operation ran before any `project()` call.
    #[error("no current project; call project() first")]
    NoCurrentProject,

    #[error("unknown toolchain '{0}' (expected 'gcc' or 'msvc')")]
    UnknownToolchain(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("compilation of {file} failed ({status})")]
    CompileFailed { file: String, status: String },
}

impl CbError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CbError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CbError>;
