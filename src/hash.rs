//! String and file hashing.
//!
//! Two families are used:
//!
//! - **DJB2** (32-bit, wrapping) keys every multimap entry.
//! - **FNV-1a** (64-bit) fingerprints file contents and the combined
//!   compiler flags of a project.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const DJB2_SEED: u32 = 5381;

const FNV1A_64_SEED: u64 = 14_695_981_039_346_656_037;
const FNV1A_64_PRIME: u64 = 1_099_511_628_211;

/// Read chunk used when hashing files.
const FILE_CHUNK_SIZE: usize = 16 * 4096;

/// DJB2 hash of `bytes`: `hash * 33 + byte`, wrapping at 32 bits.
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |hash, &b| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(b))
    })
}

/// Incremental FNV-1a 64 state.
///
/// `Fnv1a64::new()` is the seed; `combine` folds more bytes in, so hashing
/// `a` then `b` equals hashing `a ++ b` in one go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1a64(u64);

impl Fnv1a64 {
    pub fn new() -> Self {
        Self(FNV1A_64_SEED)
    }

    pub fn combine(mut self, bytes: &[u8]) -> Self {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(FNV1A_64_PRIME);
        }
        self
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot FNV-1a 64 of `bytes`.
pub fn hash_64(bytes: &[u8]) -> u64 {
    Fnv1a64::new().combine(bytes).finish()
}

/// FNV-1a 64 of a file's whole content, streamed in fixed chunks.
pub fn hash_64_file(path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut state = Fnv1a64::new();
    let mut chunk = vec![0u8; FILE_CHUNK_SIZE];

    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        state = state.combine(&chunk[..n]);
    }

    Ok(state.finish())
}
