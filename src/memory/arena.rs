//! Block-chained arena for per-bake scratch data.
//!
//! Memory is handed out from fixed-size blocks; a request that does not fit
//! moves on to the next block (reused after a reset) or appends a new one of
//! at least [`MIN_BLOCK_SIZE`] bytes. Nothing is freed individually.
//!
//! Handles carry the arena generation at allocation time. [`Arena::reset`]
//! bumps the generation, so reading a handle from before the reset panics
//! instead of silently observing reused memory.

use std::fmt;

/// Allocation granularity.
pub const ALIGNMENT: usize = 8;

/// Smallest block the arena ever allocates (8 KiB).
pub const MIN_BLOCK_SIZE: usize = 8 * 1024;

#[derive(Debug)]
struct Block {
    memory: Box<[u8]>,
    offset: usize,
}

impl Block {
    fn new(size: usize) -> Self {
        let size = size.max(MIN_BLOCK_SIZE);
        Self {
            memory: vec![0u8; size].into_boxed_slice(),
            offset: 0,
        }
    }

    fn size(&self) -> usize {
        self.memory.len()
    }

    fn fits(&self, size: usize) -> bool {
        self.offset + size <= self.size()
    }
}

/// Handle to bytes allocated in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRef {
    block: usize,
    offset: usize,
    len: usize,
    generation: u32,
}

impl ArenaRef {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Default)]
pub struct Arena {
    blocks: Vec<Block>,
    current: usize,
    generation: u32,
}

fn align_up(n: usize, align: usize) -> usize {
    (n + (align - 1)) & !(align - 1)
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `size` bytes (rounded up to [`ALIGNMENT`]).
    pub fn alloc(&mut self, size: usize) -> ArenaRef {
        let aligned = align_up(size, ALIGNMENT);

        if self.blocks.is_empty() {
            self.blocks.push(Block::new(aligned));
            self.current = 0;
        }

        if !self.blocks[self.current].fits(aligned) {
            // Blocks past the current one are empty (left over from a reset).
            let reusable = (self.current + 1..self.blocks.len())
                .find(|&i| self.blocks[i].fits(aligned));
            self.current = match reusable {
                Some(i) => i,
                None => {
                    self.blocks.push(Block::new(aligned));
                    self.blocks.len() - 1
                }
            };
        }

        let block = &mut self.blocks[self.current];
        let offset = block.offset;
        block.offset += aligned;

        ArenaRef {
            block: self.current,
            offset,
            len: size,
            generation: self.generation,
        }
    }

    pub fn alloc_bytes(&mut self, data: &[u8]) -> ArenaRef {
        let r = self.alloc(data.len());
        self.get_mut(r).copy_from_slice(data);
        r
    }

    pub fn alloc_str(&mut self, s: &str) -> ArenaRef {
        self.alloc_bytes(s.as_bytes())
    }

    /// Formats `args` straight into arena memory.
    pub fn format(&mut self, args: fmt::Arguments<'_>) -> ArenaRef {
        let mut counter = Counter(0);
        // Counting never fails.
        let _ = fmt::write(&mut counter, args);

        let r = self.alloc(counter.0);
        let mut cursor = Cursor {
            bytes: self.get_mut(r),
            pos: 0,
        };
        if fmt::write(&mut cursor, args).is_err() {
            panic!("formatting produced more output on its second pass");
        }
        r
    }

    /// Rewinds every block without releasing memory.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.offset = 0;
        }
        self.current = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Releases every block.
    pub fn destroy(&mut self) {
        self.blocks.clear();
        self.current = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes handed out since the last reset, alignment padding included.
    pub fn used(&self) -> usize {
        self.blocks.iter().map(|b| b.offset).sum()
    }

    pub fn get(&self, r: ArenaRef) -> &[u8] {
        self.check(r);
        &self.blocks[r.block].memory[r.offset..r.offset + r.len]
    }

    pub fn get_mut(&mut self, r: ArenaRef) -> &mut [u8] {
        self.check(r);
        &mut self.blocks[r.block].memory[r.offset..r.offset + r.len]
    }

    /// # Panics
    ///
    /// Panics if the bytes are not UTF-8.
    pub fn str(&self, r: ArenaRef) -> &str {
        match std::str::from_utf8(self.get(r)) {
            Ok(s) => s,
            Err(e) => panic!("arena allocation is not UTF-8: {e}"),
        }
    }

    fn check(&self, r: ArenaRef) {
        assert!(
            r.generation == self.generation && r.block < self.blocks.len(),
            "stale arena handle (generation {} vs {})",
            r.generation,
            self.generation
        );
    }
}

struct Counter(usize);

impl fmt::Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct Cursor<'b> {
    bytes: &'b mut [u8],
    pos: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.pos + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.pos..end].copy_from_slice(s.as_bytes());
        self.pos = end;
        Ok(())
    }
}
