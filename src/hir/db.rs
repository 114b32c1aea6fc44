//! Salsa database definition and queries.
//!
//! Parsing is memoized per file text. The declaration model itself lives in
//! a [`Project`](super::Project) and is rebuilt from parse results by the
//! single writer; see [`crate::ide::AnalysisHost`].

use rowan::GreenNode;

use crate::base::FileId;
use crate::parser::{self, AstNode, SourceFile, SyntaxNode};

// ============================================================================
// INPUTS
// ============================================================================

/// Input: The raw text content of a file.
///
/// Set this explicitly when a file is opened or changed.
#[salsa::input]
pub struct FileText {
    pub file: FileId,
    #[return_ref]
    pub text: String,
}

// ============================================================================
// DATABASE
// ============================================================================

/// The root Salsa database for parse queries.
#[salsa::db]
#[derive(Default, Clone)]
pub struct RootDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for RootDatabase {
    fn salsa_event(&self, _event: &dyn Fn() -> salsa::Event) {}
}

impl RootDatabase {
    /// Create a new, empty database.
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// PARSE RESULT
// ============================================================================

/// A lossless tree and the syntax errors recovered from while building it.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseResult {
    pub green: GreenNode,
    pub errors: Vec<String>,
}

// Manual Eq impl for Salsa tracking
impl Eq for ParseResult {}

impl ParseResult {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// TRACKED QUERIES
// ============================================================================

/// Parse a file.
///
/// Memoized; invalidated when the input `FileText` changes.
#[salsa::tracked]
pub fn parse_file(db: &dyn salsa::Database, file_text: FileText) -> ParseResult {
    let parse = parser::parse(file_text.text(db));
    let errors = parse.errors.iter().map(|e| e.message.clone()).collect();
    ParseResult {
        green: parse.green,
        errors,
    }
}

/// `#include` targets of a file, in source order.
#[salsa::tracked]
pub fn file_includes(db: &dyn salsa::Database, file_text: FileText) -> Vec<String> {
    let parse = parse_file(db, file_text);
    SourceFile::cast(parse.syntax())
        .map(|source| source.includes())
        .unwrap_or_default()
}
