//! Tags and tag lists
//!
//! Tags are short tokens used as the values of list-typed resources and as
//! substitution units for templates. A tag is cheap to clone; its name is
//! shared and its hash is computed once at construction.

use crate::error::TagError;
use crate::hash::djb_hash;
use crate::rules::SerializeOptions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// TAG
// ============================================================================

/// A single tag: a non-empty token free of whitespace.
#[derive(Debug, Clone)]
pub struct Tag {
    name: Arc<str>,
    hash: u64,
}

impl Tag {
    /// Create a tag, rejecting empty or whitespace-containing names.
    pub fn new(name: &str) -> Result<Self, TagError> {
        if name.is_empty() {
            return Err(TagError::EmptyName);
        }
        if name.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(TagError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: Arc::from(name),
            hash: djb_hash(name.as_bytes()),
        })
    }

    /// The tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte length of the name.
    pub fn len(&self) -> usize {
        self.name.len()
    }

    /// Always false; empty names are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// The cached name hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// True when the tag name equals `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.name.as_ref() == name
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for Tag {}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.as_bytes().cmp(other.name.as_bytes())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::new(s)
    }
}

impl Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Tag::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TAG LIST
// ============================================================================

/// An ordered sequence of tags.
///
/// The merge layer distinguishes two mutators: `mutate_add` has set-union
/// semantics (no-op when the name is already present) while `mutate_extra`
/// has multiset semantics (always appends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    tags: Vec<Tag>,
}

impl TagList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True when the list holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Append a tag at the tail.
    pub fn append(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    /// Insert a tag at the head.
    pub fn prepend(&mut self, tag: Tag) {
        self.tags.insert(0, tag);
    }

    /// Remove the first tag with the given name.
    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        let idx = self.tags.iter().position(|t| t.matches(name))?;
        Some(self.tags.remove(idx))
    }

    /// True when a tag with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Find the first tag with the given name.
    pub fn find(&self, name: &str) -> Option<&Tag> {
        let hash = djb_hash(name.as_bytes());
        self.tags
            .iter()
            .find(|t| t.hash() == hash && t.matches(name))
    }

    /// Set-union append: no-op when the name is already present.
    /// Returns true when the tag was appended.
    pub fn mutate_add(&mut self, tag: Tag) -> bool {
        if self.contains(tag.name()) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Multiset append: always appends, permitting duplicates.
    pub fn mutate_extra(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    /// Stable lexicographic sort.
    pub fn sort(&mut self) {
        self.tags.sort();
    }

    /// The tag at `index`.
    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.tags.get(index)
    }

    /// The first tag.
    pub fn first(&self) -> Option<&Tag> {
        self.tags.first()
    }

    /// The last tag.
    pub fn last(&self) -> Option<&Tag> {
        self.tags.last()
    }

    /// Bidirectional cursor over the tags. The borrow keeps the list alive
    /// and forbids structural mutation while the iterator exists.
    pub fn iter(&self) -> TagIter<'_> {
        TagIter {
            inner: self.tags.iter(),
        }
    }

    /// Exact byte length of the serialized form.
    pub fn serialized_len(&self, options: SerializeOptions) -> usize {
        let names: usize = self.tags.iter().map(Tag::len).sum();
        let separators = self.tags.len().saturating_sub(1);
        let newline = usize::from(options.contains(SerializeOptions::NEWLINE));
        names + separators + newline
    }

    /// Emit the tags separated by single spaces, with a trailing newline
    /// when the `NEWLINE` option is set. The buffer is allocated exactly.
    pub fn to_string_with(&self, options: SerializeOptions) -> String {
        let mut out = String::with_capacity(self.serialized_len(options));
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(tag.name());
        }
        if options.contains(SerializeOptions::NEWLINE) {
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(SerializeOptions::empty()))
    }
}

impl FromStr for TagList {
    type Err = TagError;

    /// Split on ASCII whitespace and append each token; any invalid token
    /// fails the whole parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut list = TagList::new();
        for token in s.split_ascii_whitespace() {
            list.append(Tag::new(token)?);
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = TagIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Tag> for TagList {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// TAG ITERATOR
// ============================================================================

/// Bidirectional cursor over a [`TagList`].
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    inner: std::slice::Iter<'a, Tag>,
}

impl<'a> Iterator for TagIter<'a> {
    type Item = &'a Tag;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> DoubleEndedIterator for TagIter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<'a> ExactSizeIterator for TagIter<'a> {}
