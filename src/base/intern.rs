//! Identifier text and qualified names.
//!
//! Names are [`SmolStr`]s: identifiers up to 23 bytes are stored inline and
//! longer ones share one allocation, so cloning a name never copies text.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// An identifier as written in source.
pub type Name = SmolStr;

/// Separator between the segments of a qualified name.
pub const SCOPE_SEPARATOR: &str = "::";

/// A `::`-separated path such as `std::vector` or `::Global`.
///
/// A leading `::` is recorded as `is_global` rather than as an empty segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    pub is_global: bool,
    pub segments: Vec<Name>,
}

impl QualifiedName {
    pub fn new(segments: Vec<Name>) -> Self {
        Self {
            is_global: false,
            segments,
        }
    }

    /// Split `text` at `::`, trimming whitespace around each segment.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (is_global, rest) = match text.strip_prefix(SCOPE_SEPARATOR) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let segments = rest
            .split(SCOPE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Name::new)
            .collect();
        Self {
            is_global,
            segments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Name> {
        self.segments.last()
    }

    /// The path without its final segment.
    pub fn qualifier(&self) -> &[Name] {
        match self.segments.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Join segments with `::`, skipping empty ones (anonymous scopes).
    pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
        let mut out = String::new();
        for seg in segments.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()) {
            if !out.is_empty() {
                out.push_str(SCOPE_SEPARATOR);
            }
            out.push_str(seg);
        }
        out
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_global {
            f.write_str(SCOPE_SEPARATOR)?;
        }
        f.write_str(&Self::join(&self.segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        let q = QualifiedName::parse("std::vector");
        assert!(!q.is_global);
        assert_eq!(q.segments, vec!["std", "vector"]);
        assert_eq!(q.qualifier(), &[Name::new("std")]);
        assert_eq!(q.last().map(Name::as_str), Some("vector"));
    }

    #[test]
    fn test_parse_global_path() {
        let q = QualifiedName::parse("::A :: B");
        assert!(q.is_global);
        assert_eq!(q.segments, vec!["A", "B"]);
        assert_eq!(q.to_string(), "::A::B");
    }

    #[test]
    fn test_join_skips_empty_segments() {
        assert_eq!(QualifiedName::join(&["", "N", "", "S"]), "N::S");
        assert_eq!(QualifiedName::join::<&str>(&[]), "");
    }
}
