//! Shared helpers for the integration suite.

pub mod model_helpers;
pub mod source_fixtures;
