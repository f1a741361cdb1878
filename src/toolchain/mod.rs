//! Toolchain families and their output conventions
//!
//! A [`Toolchain`] decides the compiler executable, the argument that makes
//! it emit header dependencies, and where objects, artifacts and the
//! incremental cache live (`.build/msvc` or `.build/gcc` by default).

pub mod types;

pub use types::{Toolchain, ToolchainFamily};

use std::process::{Command, Stdio};

/// MSVC on Windows, GCC elsewhere
pub fn default_toolchain() -> Toolchain {
    #[cfg(windows)]
    {
        Toolchain::msvc()
    }

    #[cfg(not(windows))]
    {
        Toolchain::gcc()
    }
}

/// Whether the toolchain's compiler can be launched at all
pub fn compiler_available(toolchain: &Toolchain) -> bool {
    let mut cmd = Command::new(&toolchain.compiler);
    if toolchain.family == ToolchainFamily::Gcc {
        cmd.arg("--version");
    }
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
