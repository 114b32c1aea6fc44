//! Parser tests
//!
//! The tree is lossless for any input, and the AST layer sees the
//! declarations of real-looking sources.

pub mod tests_lossless;
