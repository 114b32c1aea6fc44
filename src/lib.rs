//! # cppmodel-base
//!
//! Semantic model of C and C++ declarations: identity, scopes, types,
//! name resolution and template specialization over incrementally
//! re-parsed files.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → AnalysisHost (single writer) and Analysis (readers)
//!   ↓
//! hir       → Declarations, types, resolver, templates, identity store
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, rowan tree, AST
//!   ↓
//! base      → Primitives (FileId, Name, TextRange, LineIndex)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → hir → ide)
// ============================================================================

/// Foundation types: FileId, Name, TextRange
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// High-level IR: the declaration and type model
pub mod hir;

/// IDE queries: host and read-only snapshots
pub mod ide;

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, Name, QualifiedName, TextRange, TextSize};
