//! Thread-local transient buffer.
//!
//! Every short-lived string (cache paths, formatted records, dependency
//! paths) is carved out of a single per-thread byte buffer with a hard
//! capacity. Scopes nest like a stack: [`TmpBuffer::save`] returns the
//! cursor, [`TmpBuffer::restore`] truncates back to it.
//!
//! Allocations are returned as [`TmpRef`] handles (offset + length) rather
//! than pointers. Reading a handle that lies beyond the current cursor, i.e.
//! one released by a `restore`, panics.
//!
//! ```
//! use cbake::memory::tmp;
//!
//! let path = tmp::scope(|t| {
//!     let r = t.format(format_args!("{}/{}.cache", ".build/gcc", "foo"));
//!     t.str(r).to_string()
//! });
//! assert_eq!(path, ".build/gcc/foo.cache");
//! ```

use std::cell::RefCell;
use std::fmt;

/// Hard ceiling of each thread's buffer. Must be big enough for any
/// single bake; exhaustion is a configuration error.
pub const TMP_CAPACITY: usize = 8 * 1024 * 1024;

/// Upfront reservation, the buffer grows lazily up to its capacity.
const PREALLOC_BYTES: usize = 64 * 1024;

/// Cursor position returned by [`TmpBuffer::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TmpMark(usize);

impl TmpMark {
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Handle to bytes allocated in a [`TmpBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TmpRef {
    offset: usize,
    len: usize,
}

impl TmpRef {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Fixed-capacity bump buffer.
#[derive(Debug)]
pub struct TmpBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl TmpBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity.min(PREALLOC_BYTES)),
            capacity,
        }
    }

    /// Bytes currently in use (the cursor).
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn save(&self) -> TmpMark {
        TmpMark(self.bytes.len())
    }

    /// Truncates the cursor back to `mark`.
    ///
    /// # Panics
    ///
    /// Panics if `mark` lies beyond the cursor, which means scopes were not
    /// nested (an inner mark restored after its outer one).
    pub fn restore(&mut self, mark: TmpMark) {
        assert!(
            mark.0 <= self.bytes.len(),
            "tmp restore to {} but cursor is {}: save/restore are not nested",
            mark.0,
            self.bytes.len()
        );
        self.bytes.truncate(mark.0);
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Allocates `size` zeroed bytes, or `None` when the capacity would be
    /// exceeded.
    pub fn try_alloc(&mut self, size: usize) -> Option<TmpRef> {
        let offset = self.bytes.len();
        if offset.checked_add(size)? > self.capacity {
            return None;
        }
        self.bytes.resize(offset + size, 0);
        Some(TmpRef { offset, len: size })
    }

    /// Allocates `size` zeroed bytes.
    ///
    /// # Panics
    ///
    /// Panics when the buffer is exhausted.
    pub fn alloc(&mut self, size: usize) -> TmpRef {
        match self.try_alloc(size) {
            Some(r) => r,
            None => panic!(
                "tmp buffer exhausted: {} + {} bytes exceeds capacity {}; increase TMP_CAPACITY",
                self.bytes.len(),
                size,
                self.capacity
            ),
        }
    }

    pub fn alloc_bytes(&mut self, data: &[u8]) -> TmpRef {
        let r = self.alloc(data.len());
        self.bytes[r.offset..r.end()].copy_from_slice(data);
        r
    }

    pub fn alloc_str(&mut self, s: &str) -> TmpRef {
        self.alloc_bytes(s.as_bytes())
    }

    /// Formats `args` directly into the buffer.
    pub fn format(&mut self, args: fmt::Arguments<'_>) -> TmpRef {
        let offset = self.bytes.len();
        let mut writer = Writer { buffer: self };
        if fmt::write(&mut writer, args).is_err() {
            panic!("tmp buffer exhausted while formatting; increase TMP_CAPACITY");
        }
        TmpRef {
            offset,
            len: self.bytes.len() - offset,
        }
    }

    /// Whether `r` still points at live bytes.
    pub fn contains(&self, r: TmpRef) -> bool {
        r.end() <= self.bytes.len()
    }

    pub fn get(&self, r: TmpRef) -> &[u8] {
        self.check(r);
        &self.bytes[r.offset..r.end()]
    }

    pub fn get_mut(&mut self, r: TmpRef) -> &mut [u8] {
        self.check(r);
        &mut self.bytes[r.offset..r.end()]
    }

    /// # Panics
    ///
    /// Panics if the bytes are not UTF-8; allocations made through
    /// [`TmpBuffer::alloc_str`] and [`TmpBuffer::format`] always are.
    pub fn str(&self, r: TmpRef) -> &str {
        match std::str::from_utf8(self.get(r)) {
            Ok(s) => s,
            Err(e) => panic!("tmp allocation is not UTF-8: {e}"),
        }
    }

    /// Runs `f` inside a nested save/restore scope.
    pub fn scope<R>(&mut self, f: impl FnOnce(&mut TmpBuffer) -> R) -> R {
        let mark = self.save();
        let result = f(self);
        self.restore(mark);
        result
    }

    fn check(&self, r: TmpRef) {
        assert!(
            self.contains(r),
            "tmp allocation {}..{} was released (cursor is {})",
            r.offset,
            r.end(),
            self.bytes.len()
        );
    }
}

struct Writer<'b> {
    buffer: &'b mut TmpBuffer,
}

impl fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buffer.bytes.len() + s.len() > self.buffer.capacity {
            return Err(fmt::Error);
        }
        self.buffer.bytes.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

thread_local! {
    static TMP: RefCell<TmpBuffer> = RefCell::new(TmpBuffer::with_capacity(TMP_CAPACITY));
}

/// Gives `f` exclusive access to this thread's buffer.
///
/// Not reentrant: nest through [`TmpBuffer::scope`] on the buffer handed to
/// `f` instead of calling `with` again.
pub fn with<R>(f: impl FnOnce(&mut TmpBuffer) -> R) -> R {
    TMP.with(|tmp| f(&mut tmp.borrow_mut()))
}

pub fn save() -> TmpMark {
    with(|tmp| tmp.save())
}

pub fn restore(mark: TmpMark) {
    with(|tmp| tmp.restore(mark))
}

/// Saves the cursor, runs `f`, then restores it.
pub fn scope<R>(f: impl FnOnce(&mut TmpBuffer) -> R) -> R {
    with(|tmp| tmp.scope(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_returns_cursor_to_mark() {
        let mut tmp = TmpBuffer::with_capacity(1024);
        tmp.alloc(10);

        let mark = tmp.save();
        tmp.alloc(7);
        tmp.alloc_str("include/foo.h");
        tmp.restore(mark);

        assert_eq!(tmp.size(), mark.position());
    }

    #[test]
    fn test_alloc_after_restore_reuses_space() {
        let mut tmp = TmpBuffer::with_capacity(1024);
        let mark = tmp.save();
        let first = tmp.alloc(32);
        tmp.restore(mark);

        let second = tmp.alloc(16);
        assert_eq!(first.offset(), second.offset());
    }

    #[test]
    fn test_format_and_read_back() {
        let mut tmp = TmpBuffer::with_capacity(1024);
        let r = tmp.format(format_args!("{};{};{}", "a.h", 12, 34));
        assert_eq!(tmp.str(r), "a.h;12;34");
    }

    #[test]
    fn test_try_alloc_exhaustion() {
        let mut tmp = TmpBuffer::with_capacity(8);
        assert!(tmp.try_alloc(8).is_some());
        assert!(tmp.try_alloc(1).is_none());
    }

    #[test]
    #[should_panic(expected = "tmp buffer exhausted")]
    fn test_alloc_exhaustion_is_fatal() {
        let mut tmp = TmpBuffer::with_capacity(4);
        tmp.alloc(5);
    }

    #[test]
    #[should_panic(expected = "was released")]
    fn test_released_handle_panics() {
        let mut tmp = TmpBuffer::with_capacity(64);
        let mark = tmp.save();
        let r = tmp.alloc_str("gone");
        tmp.restore(mark);
        let _ = tmp.get(r);
    }

    #[test]
    #[should_panic(expected = "not nested")]
    fn test_unnested_restore_panics() {
        let mut tmp = TmpBuffer::with_capacity(64);
        tmp.alloc(4);
        let inner = tmp.save();
        tmp.restore(TmpMark(0));
        tmp.restore(inner);
    }

    #[test]
    fn test_nested_scopes() {
        let mut tmp = TmpBuffer::with_capacity(256);
        let outer = tmp.alloc_str("outer");
        tmp.scope(|t| {
            let inner = t.alloc_str("inner");
            t.scope(|t| {
                t.alloc_str("innermost");
            });
            assert_eq!(t.str(inner), "inner");
            assert_eq!(t.size(), "outerinner".len());
        });
        assert_eq!(tmp.str(outer), "outer");
        assert_eq!(tmp.size(), "outer".len());
    }

    #[test]
    fn test_thread_local_scope() {
        let before = save();
        let len = scope(|t| {
            let r = t.alloc_str("transient");
            t.get(r).len()
        });
        assert_eq!(len, 9);
        assert_eq!(save(), before);
    }

    #[test]
    fn test_threads_do_not_share_buffers() {
        with(|t| {
            t.alloc_str("main thread");
        });
        let other = std::thread::spawn(|| save().position()).join().unwrap();
        assert_eq!(other, 0);
        with(|t| t.reset());
    }
}
