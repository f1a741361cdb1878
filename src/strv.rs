//! Non-owning string views.
//!
//! A [`StrView`] borrows bytes without assuming UTF-8 or a terminator. Its
//! ordering is byte-lexicographic, except that when one view is a prefix of
//! the other the *shorter* one sorts as greater. The multimap depends on this
//! exact direction for its range scans.

use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StrView<'a> {
    bytes: &'a [u8],
}

impl<'a> StrView<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Lossless when the view holds UTF-8, replacement characters otherwise.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.bytes).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return true;
        }
        self.bytes.windows(needle.len()).any(|w| w == needle)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.bytes.starts_with(prefix.as_bytes())
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.bytes.ends_with(suffix.as_bytes())
    }

    pub fn sub(&self, start: usize, end: usize) -> StrView<'a> {
        StrView::new(&self.bytes[start..end])
    }
}

/// Compares two byte strings with the view ordering.
pub fn compare(left: &[u8], right: &[u8]) -> Ordering {
    for (l, r) in left.iter().zip(right.iter()) {
        match l.cmp(r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    // Shorter-is-greater on a common prefix.
    right.len().cmp(&left.len())
}

impl Ord for StrView<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.bytes, other.bytes)
    }
}

impl PartialOrd for StrView<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> From<&'a str> for StrView<'a> {
    fn from(s: &'a str) -> Self {
        StrView::new(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for StrView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        StrView::new(bytes)
    }
}

impl PartialEq<str> for StrView<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for StrView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl fmt::Debug for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.bytes))
    }
}

impl fmt::Display for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_views() {
        assert_eq!(compare(b"files", b"files"), Ordering::Equal);
        assert_eq!(StrView::from("files"), "files");
    }

    #[test]
    fn test_first_differing_byte_decides() {
        assert_eq!(compare(b"abc", b"abd"), Ordering::Less);
        assert_eq!(compare(b"b", b"abc"), Ordering::Greater);
    }

    #[test]
    fn test_shorter_is_greater_on_common_prefix() {
        assert_eq!(compare(b"ab", b"abc"), Ordering::Greater);
        assert_eq!(compare(b"abc", b"ab"), Ordering::Less);
        assert!(StrView::from("") > StrView::from("a"));
    }

    #[test]
    fn test_sort_is_total() {
        let mut words = vec!["b", "a", "ab", "", "abc"];
        words.sort_by(|l, r| compare(l.as_bytes(), r.as_bytes()));
        assert_eq!(words, vec!["abc", "ab", "a", "b", ""]);
    }

    #[test]
    fn test_contains_and_affixes() {
        let v = StrView::from(r"C:\Program Files\Microsoft Visual Studio\include\stdio.h");
        assert!(v.contains(r"\Microsoft Visual Studio\"));
        assert!(!v.contains(r"\Windows Kits\"));
        assert!(v.starts_with("C:"));
        assert!(v.ends_with(".h"));
        assert!(v.contains(""));
    }

    #[test]
    fn test_sub_view() {
        let v = StrView::from("target.o: a.h");
        assert_eq!(v.sub(0, 8), "target.o");
        assert_eq!(v.sub(10, 13).to_string(), "a.h");
    }
}
