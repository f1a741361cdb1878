//! Allocators backing temporary and per-bake data.
//!
//! - [`tmp`] - per-thread bump buffer with save/restore checkpoints
//! - [`arena`] - block-chained arena reset between bakes

pub mod arena;
pub mod tmp;

pub use arena::{Arena, ArenaRef};
pub use tmp::{TmpBuffer, TmpMark, TmpRef};
