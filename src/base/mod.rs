//! Foundation types for the C/C++ model.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Interned file identifiers
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Name`] - Cheap-to-clone identifier text and qualified-name helpers
//!
//! This module has NO dependencies on other cppmodel modules.

mod file_id;
mod intern;
mod span;

pub use file_id::{FileId, FileIdAllocator};
pub use intern::{Name, QualifiedName, SCOPE_SEPARATOR};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
