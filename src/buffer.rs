//! Growable buffers.
//!
//! [`DynArray`] is a contiguous array with an explicit capacity policy
//! (1.5x growth, floor of 8) and index-based bulk insert/remove.
//! [`DynString`] specializes the same policy into a string builder that is
//! always null-terminated once it owns storage, and allocates nothing until
//! the first write.

use std::fmt;
use std::ops::Deref;

/// Smallest capacity ever allocated.
pub const MIN_CAPACITY: usize = 8;

/// Capacity to grow to when `requested` elements must fit.
pub fn get_new_capacity(capacity: usize, requested: usize) -> usize {
    requested.max(capacity + capacity / 2).max(MIN_CAPACITY)
}

/// Index of the first element for which `less(element)` is false.
///
/// `slice` must be partitioned by `less` (all `true` before all `false`).
pub fn lower_bound_by<T>(slice: &[T], mut less: impl FnMut(&T) -> bool) -> usize {
    let mut left = 0;
    let mut count = slice.len();

    while count > 0 {
        let step = count / 2;
        let mid = left + step;
        if less(&slice[mid]) {
            left = mid + 1;
            count -= step + 1;
        } else {
            count = step;
        }
    }
    left
}

#[derive(Clone)]
pub struct DynArray<T> {
    data: Vec<T>,
    capacity: usize,
}

impl<T> DynArray<T> {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            capacity: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grows storage to exactly `new_capacity`; never shrinks.
    pub fn reserve(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity {
            return;
        }
        self.data.reserve_exact(new_capacity - self.data.len());
        self.capacity = new_capacity;
    }

    fn grow_if_needed(&mut self, needed: usize) {
        if needed > self.capacity {
            self.reserve(get_new_capacity(self.capacity, needed));
        }
    }

    /// Inserts `values` before `index`; `index == len()` appends.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_many(&mut self, index: usize, values: impl IntoIterator<Item = T>) {
        assert!(
            index <= self.data.len(),
            "insert index {index} out of bounds (len {})",
            self.data.len()
        );
        let values: Vec<T> = values.into_iter().collect();
        self.grow_if_needed(self.data.len() + values.len());
        self.data.splice(index..index, values);
    }

    pub fn insert_one(&mut self, index: usize, value: T) {
        assert!(
            index <= self.data.len(),
            "insert index {index} out of bounds (len {})",
            self.data.len()
        );
        self.grow_if_needed(self.data.len() + 1);
        self.data.insert(index, value);
    }

    pub fn push_back(&mut self, value: T) {
        self.insert_one(self.data.len(), value);
    }

    /// Removes `count` elements starting at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()` or the range runs past the end.
    pub fn remove_many(&mut self, index: usize, count: usize) -> Vec<T> {
        assert!(
            index < self.data.len(),
            "remove index {index} out of bounds (len {})",
            self.data.len()
        );
        assert!(
            index + count <= self.data.len(),
            "remove range {index}..{} out of bounds (len {})",
            index + count,
            self.data.len()
        );
        self.data.drain(index..index + count).collect()
    }

    pub fn remove_one(&mut self, index: usize) -> T {
        assert!(
            index < self.data.len(),
            "remove index {index} out of bounds (len {})",
            self.data.len()
        );
        self.data.remove(index)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn lower_bound_by(&self, less: impl FnMut(&T) -> bool) -> usize {
        lower_bound_by(&self.data, less)
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl<T> std::ops::Index<usize> for DynArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

const NUL: char = '\0';

/// Null-terminated string builder.
///
/// `len()` never counts the terminator. An unwritten string owns no
/// storage and reports the shared empty string.
#[derive(Clone, Default)]
pub struct DynString {
    // Logical content followed by one NUL once allocated.
    text: String,
    capacity: usize,
}

impl DynString {
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            capacity: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any storage was allocated yet.
    pub fn is_allocated(&self) -> bool {
        self.capacity > 0
    }

    pub fn as_str(&self) -> &str {
        &self.text[..self.len()]
    }

    /// Content plus the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if self.text.is_empty() {
            b"\0"
        } else {
            self.text.as_bytes()
        }
    }

    /// Reserves room for `new_capacity` characters plus the terminator.
    pub fn reserve(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity {
            return;
        }
        self.text.reserve_exact(new_capacity + 1 - self.text.len());
        self.capacity = new_capacity;
    }

    fn grow_if_needed(&mut self, needed: usize) {
        if needed > self.capacity {
            self.reserve(get_new_capacity(self.capacity, needed));
        }
    }

    /// Replaces everything from byte `index` on with `s`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or is not a char boundary.
    pub fn append_from(&mut self, index: usize, s: &str) {
        assert!(
            index <= self.len(),
            "append index {index} out of bounds (len {})",
            self.len()
        );
        self.grow_if_needed(index + s.len());
        self.text.truncate(index);
        self.text.push_str(s);
        self.text.push(NUL);
    }

    pub fn append(&mut self, s: &str) {
        self.append_from(self.len(), s);
    }

    pub fn append_many(&mut self, parts: &[&str]) {
        for part in parts {
            self.append(part);
        }
    }

    /// Appends formatted text, returning the number of bytes added.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> usize {
        let before = self.len();
        match args.as_str() {
            Some(s) => self.append(s),
            None => self.append(&args.to_string()),
        }
        self.len() - before
    }

    pub fn assign(&mut self, s: &str) {
        self.append_from(0, s);
    }

    pub fn assign_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.clear();
        self.append_fmt(args);
    }

    /// Empties the string, keeping its storage.
    pub fn clear(&mut self) {
        if self.is_allocated() {
            self.text.clear();
            self.text.push(NUL);
        }
    }
}

impl Deref for DynString {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for DynString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DynString {}

impl PartialEq<str> for DynString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for DynString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<&str> for DynString {
    fn from(s: &str) -> Self {
        let mut d = DynString::new();
        d.assign(s);
        d
    }
}

impl From<String> for DynString {
    fn from(s: String) -> Self {
        DynString::from(s.as_str())
    }
}

impl fmt::Debug for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Write for DynString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}
