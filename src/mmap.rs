//! Ordered multimap keyed by hashed strings.
//!
//! Entries live in one sorted [`DynArray`]. The order is the entry
//! comparator: a *larger* DJB2 hash sorts first, and equal hashes fall back
//! to [`strv::compare`]. Every entry for a key is therefore contiguous, which
//! is what [`Multimap::get_range`] relies on.
//!
//! Duplicates of one key keep insertion order: a new entry is placed after
//! every entry that compares equal to it.

use std::cmp::Ordering;
use std::fmt;

use crate::buffer::{DynArray, DynString};
use crate::hash::djb2;
use crate::strv;

/// Value stored next to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Index into storage owned by the caller (projects in a context).
    Handle(usize),
    Str(DynString),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::Handle(_) => None,
        }
    }

    pub fn as_handle(&self) -> Option<usize> {
        match self {
            Value::Handle(h) => Some(*h),
            Value::Str(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(DynString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(DynString::from(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Handle(h) => write!(f, "#{h}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    hash: u32,
    key: DynString,
    value: Value,
}

impl KeyValue {
    pub fn new(key: &str, value: Value) -> Self {
        Self {
            hash: djb2(key.as_bytes()),
            key: DynString::from(key),
            value,
        }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value when it is a string, `""` otherwise.
    pub fn str_value(&self) -> &str {
        self.value.as_str().unwrap_or("")
    }

    fn probe(&self) -> Probe<'_> {
        Probe {
            hash: self.hash,
            key: self.key.as_bytes(),
        }
    }
}

/// Hash and key of a lookup, computed once per operation.
#[derive(Clone, Copy)]
struct Probe<'k> {
    hash: u32,
    key: &'k [u8],
}

impl<'k> Probe<'k> {
    fn new(key: &'k str) -> Self {
        Self {
            hash: djb2(key.as_bytes()),
            key: key.as_bytes(),
        }
    }
}

fn compare(left: Probe<'_>, right: Probe<'_>) -> Ordering {
    // Larger hash is "less".
    right
        .hash
        .cmp(&left.hash)
        .then_with(|| strv::compare(left.key, right.key))
}

/// Contiguous run of entries sharing one key.
#[derive(Debug, Clone, Copy)]
pub struct Range<'m> {
    pub begin: usize,
    pub end: usize,
    entries: &'m [KeyValue],
}

impl<'m> Range<'m> {
    pub fn count(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn as_slice(&self) -> &'m [KeyValue] {
        &self.entries[self.begin..self.end]
    }

    pub fn iter(&self) -> std::slice::Iter<'m, KeyValue> {
        self.as_slice().iter()
    }

    /// String values in order, handles skipped.
    pub fn values(self) -> impl Iterator<Item = &'m str> {
        self.as_slice().iter().filter_map(|kv| kv.value.as_str())
    }
}

impl<'m> IntoIterator for Range<'m> {
    type Item = &'m KeyValue;
    type IntoIter = std::slice::Iter<'m, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Multimap {
    entries: DynArray<KeyValue>,
}

impl Multimap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts after every entry with the same key.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        let kv = KeyValue::new(key, value.into());
        let probe = kv.probe();
        let index = self
            .entries
            .lower_bound_by(|e| compare(e.probe(), probe) != Ordering::Greater);
        self.entries.insert_one(index, kv);
    }

    fn lower_bound(&self, probe: Probe<'_>) -> usize {
        self.entries
            .lower_bound_by(|e| compare(e.probe(), probe) == Ordering::Less)
    }

    /// Index of the first entry for `key`, or `len()` when absent.
    pub fn find(&self, key: &str) -> usize {
        let probe = Probe::new(key);
        let index = self.lower_bound(probe);
        match self.entries.get(index) {
            Some(e) if compare(e.probe(), probe) == Ordering::Equal => index,
            _ => self.entries.len(),
        }
    }

    pub fn get_range(&self, key: &str) -> Range<'_> {
        let probe = Probe::new(key);
        let begin = self.find(key);
        let mut end = begin;
        while let Some(e) = self.entries.get(end)
            && compare(e.probe(), probe) == Ordering::Equal
        {
            end += 1;
        }
        Range {
            begin,
            end,
            entries: self.entries.as_slice(),
        }
    }

    /// Removes every entry for `key`, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let range = self.get_range(key);
        let (begin, count) = (range.begin, range.count());
        for _ in 0..count {
            self.entries.remove_one(begin);
        }
        count
    }

    /// Removes the first `key` entry whose string value equals `value`.
    pub fn remove_one(&mut self, key: &str, value: &str) -> bool {
        let range = self.get_range(key);
        let position = range
            .iter()
            .position(|kv| kv.value.as_str() == Some(value));
        match position {
            Some(offset) => {
                let index = range.begin + offset;
                self.entries.remove_one(index);
                true
            }
            None => false,
        }
    }

    pub fn try_get_first(&self, key: &str) -> Option<&KeyValue> {
        self.entries.get(self.find(key))
    }

    pub fn get(&self, index: usize) -> Option<&KeyValue> {
        self.entries.get(index)
    }

    /// Entries in sort order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyValue> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'m> IntoIterator for &'m Multimap {
    type Item = &'m KeyValue;
    type IntoIter = std::slice::Iter<'m, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
