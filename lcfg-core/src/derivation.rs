//! Derivation metadata
//!
//! Provenance for a resource assignment: the ordered set of source files
//! (with optional line numbers) that contributed its value.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One source location, `file` or `file:line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
}

impl SourceLocation {
    /// A location without a line number.
    pub fn file(file: &str) -> Self {
        Self {
            file: file.to_string(),
            line: None,
        }
    }

    /// A location with a line number.
    pub fn file_line(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line: Some(line),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => f.write_str(&self.file),
        }
    }
}

impl FromStr for SourceLocation {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ResourceError::InvalidDerivation {
                given: s.to_string(),
            });
        }
        // A trailing ":<digits>" is a line number; anything else is part of
        // the file name.
        if let Some((file, line)) = s.rsplit_once(':') {
            if !file.is_empty() {
                if let Ok(line) = line.parse::<u32>() {
                    return Ok(Self::file_line(file, line));
                }
            }
        }
        Ok(Self::file(s))
    }
}

/// Ordered, deduplicated set of source locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    entries: Vec<SourceLocation>,
}

impl Derivation {
    /// Create an empty derivation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no location is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a location, keeping insertion order and dropping duplicates.
    pub fn push(&mut self, location: SourceLocation) {
        if !self.entries.contains(&location) {
            self.entries.push(location);
        }
    }

    /// Append every location of `other`.
    pub fn merge(&mut self, other: &Derivation) {
        for location in &other.entries {
            self.push(location.clone());
        }
    }

    /// Iterate the locations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceLocation> {
        self.entries.iter()
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, location) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", location)?;
        }
        Ok(())
    }
}

impl FromStr for Derivation {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut derivation = Derivation::new();
        for token in s.split_ascii_whitespace() {
            derivation.push(token.parse()?);
        }
        Ok(derivation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_round_trip() {
        let loc: SourceLocation = "profile.xml:42".parse().expect("valid location");
        assert_eq!(loc, SourceLocation::file_line("profile.xml", 42));
        assert_eq!(loc.to_string(), "profile.xml:42");

        let bare: SourceLocation = "defaults.h".parse().expect("valid location");
        assert_eq!(bare, SourceLocation::file("defaults.h"));
    }

    #[test]
    fn test_non_numeric_suffix_is_part_of_file() {
        let loc: SourceLocation = "dir:sub".parse().expect("valid location");
        assert_eq!(loc, SourceLocation::file("dir:sub"));
    }

    #[test]
    fn test_push_dedups_preserving_order() {
        let mut d = Derivation::new();
        d.push(SourceLocation::file_line("a", 1));
        d.push(SourceLocation::file_line("b", 2));
        d.push(SourceLocation::file_line("a", 1));
        assert_eq!(d.len(), 2);
        assert_eq!(d.to_string(), "a:1 b:2");
    }

    #[test]
    fn test_merge_accumulates() {
        let mut d: Derivation = "a:1".parse().expect("valid derivation");
        let other: Derivation = "a:1 b:2".parse().expect("valid derivation");
        d.merge(&other);
        assert_eq!(d.to_string(), "a:1 b:2");
    }
}
