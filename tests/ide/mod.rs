//! IDE layer tests
//!
//! Tests for the host and its read-only handles:
//! - Applying, replacing and removing file text
//! - Include-aware and position-aware resolution
//! - Member and type queries
//! - Readers running alongside the writer

pub mod tests_concurrency;
pub mod tests_host;
pub mod tests_queries;
