//! HIR layer tests
//!
//! Tests for the declaration model:
//! - Codec round trips and persistence
//! - Disposal and re-rendering
//! - Forward declarations and placeholders
//! - Classifier caching across generations
//! - Qualified names, member ordering and templates
//! - Libraries, using directives and malformed input

pub mod tests_codec;
pub mod tests_disposal;
pub mod tests_forward;
pub mod tests_generations;
pub mod tests_libraries;
pub mod tests_malformed;
pub mod tests_members;
pub mod tests_names;
pub mod tests_persistence;
pub mod tests_templates;
