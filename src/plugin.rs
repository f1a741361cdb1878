//! Hooks a bake calls around each compilation.

use std::path::PathBuf;

use crate::project::Project;
use crate::toolchain::Toolchain;

/// What a finished compilation left behind.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub stdout: String,
    pub stderr: String,
    /// Makefile rule written next to the object (GCC `-MMD`).
    pub depfile: Option<PathBuf>,
}

/// Observer of a bake.
///
/// Every method has a no-op default, so a plugin only implements the hooks
/// it cares about.
pub trait BuildPlugin {
    fn name(&self) -> &str;

    /// Called once before any file of `project` is looked at.
    fn bake_starting(&mut self, _toolchain: &Toolchain, _project: &Project) {}

    /// Extra compiler argument this plugin needs.
    fn extra_argument(&self, _toolchain: &Toolchain) -> Option<&'static str> {
        None
    }

    /// Whether `file` must be compiled. A file is compiled only if every
    /// plugin agrees.
    fn can_process_file(&mut self, _file: &str) -> bool {
        true
    }

    /// Called instead of [`can_process_file`](BuildPlugin::can_process_file)
    /// when `file` has no object and is compiled unconditionally.
    fn file_forced(&mut self, _file: &str) {}

    /// Called after `file` compiled successfully.
    fn file_processed(&mut self, _file: &str, _output: &CompileOutput) {}

    /// Called once when the bake ends, `success` false when it stopped on
    /// a compile error.
    fn bake_finished(&mut self, _success: bool) {}
}
