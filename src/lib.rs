//! # cbake - C/C++ build configuration library
//!
//! cbake describes C and C++ projects (executables, static and shared
//! libraries) as sets of key/multi-value properties and compiles them with
//! MSVC or GCC, skipping files whose dependencies did not change.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cbake::bake::{Baker, ProcessCompiler};
//! use cbake::incremental::IncrementalBuild;
//! use cbake::project::{Context, keys};
//! use cbake::toolchain::default_toolchain;
//!
//! # fn main() -> Result<(), cbake::error::CbError> {
//! let mut ctx = Context::new();
//! ctx.project("app");
//! ctx.set(keys::BINARY_TYPE, keys::EXE)?;
//! ctx.add_file("src/main.c")?;
//!
//! let mut baker = Baker::new(default_toolchain()).with_plugin(IncrementalBuild::new());
//! let report = baker.bake(&ctx, "app", &mut ProcessCompiler)?;
//! println!("{} compiled", report.compiled.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`memory`] - Thread-local bump buffer and block arena
//! - [`buffer`], [`strv`], [`hash`], [`mmap`] - Containers behind every property
//! - [`project`] - Projects and the build context
//! - [`deps`] - GCC / MSVC dependency parsers
//! - [`incremental`] - Per-file fingerprint cache
//! - [`bake`] - Compilation driver
//! - [`commands`] - CLI command handlers

/// Compilation driver and compiler seam.
pub mod bake;

/// Growable array and string builder.
pub mod buffer;

/// CLI command handlers.
pub mod commands;

/// Configuration file parsing (`cbake.toml`).
pub mod config;

/// Compiler-emitted dependency parsers.
pub mod deps;

pub mod error;

/// File identity and fingerprints.
pub mod fileinfo;

/// DJB2 and FNV-1a hashing.
pub mod hash;

/// Incremental build cache.
pub mod incremental;

/// Tracing subscriber setup.
pub mod logging;

pub mod memory;

/// Ordered multimap.
pub mod mmap;

/// Bake plugin hooks.
pub mod plugin;

/// Projects and context.
pub mod project;

/// String views.
pub mod strv;

/// Toolchain families and output layout.
pub mod toolchain;

/// Terminal UI utilities.
pub mod ui;
