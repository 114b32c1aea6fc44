//! Owned snapshots handed to IDE callers.

use crate::base::{FileId, LineCol, Name, TextRange};
use crate::hir::{DeclKind, Declaration, Project, Uid, Visibility};

/// A declaration as it looked when the query ran.
///
/// Nothing in here points back into the model; later edits never change
/// an already returned `DeclInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclInfo {
    pub uid: Uid,
    pub kind: DeclKind,
    pub name: Name,
    pub qualified_name: String,
    pub file: Option<FileId>,
    pub range: TextRange,
    /// Line and column of the start, when the host knows the file text.
    pub start: Option<LineCol>,
    pub visibility: Visibility,
    pub is_valid: bool,
    pub is_placeholder: bool,
    /// The declared type as written.
    pub type_text: Option<String>,
}

impl DeclInfo {
    pub(crate) fn new(project: &Project, decl: &Declaration, start: Option<LineCol>) -> Self {
        Self {
            uid: decl.uid(),
            kind: decl.kind(),
            name: decl.name().clone(),
            qualified_name: decl.qualified_name(project),
            file: decl.file(),
            range: decl.range(),
            start,
            visibility: decl.visibility(),
            is_valid: decl.is_valid(),
            is_placeholder: decl.is_placeholder(),
            type_text: decl.declared_type().map(|t| t.text()),
        }
    }
}

/// Narrows [`Analysis::members`](super::Analysis::members).
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    /// Only members with exactly this name.
    pub name: Option<String>,
    /// Only members of these kinds. Empty means every kind.
    pub kinds: Vec<DeclKind>,
    /// Also list what base classes contribute, after the class's own members.
    pub include_inherited: bool,
}

impl MemberFilter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn of_kinds(kinds: impl IntoIterator<Item = DeclKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn inherited(mut self) -> Self {
        self.include_inherited = true;
        self
    }

    pub fn accepts(&self, decl: &Declaration) -> bool {
        self.name.as_deref().is_none_or(|name| decl.name() == name)
            && (self.kinds.is_empty() || self.kinds.contains(&decl.kind()))
    }
}
