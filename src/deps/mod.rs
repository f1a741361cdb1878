//! Compiler-emitted dependency parsers.
//!
//! - [`GccDepParser`] streams a Makefile rule written by `gcc -MMD`
//! - [`MsvcDepParser`] scans the stdout of `cl /showIncludes`
//!
//! Both are forward-only iterators: once exhausted they stay exhausted
//! until `reset` binds new input.

mod gcc;
mod msvc;

pub use gcc::{GccDepParser, READ_BUFFER_SIZE};
pub use msvc::{MsvcDepParser, SHOW_INCLUDES_PREFIXES, SYSTEM_PATH_FRAGMENTS};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Dependencies listed in a `.d` file.
pub fn read_gcc_depfile(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    Ok(GccDepParser::new(BufReader::new(file)).collect())
}
