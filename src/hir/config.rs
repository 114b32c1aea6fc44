//! Model configuration.

use serde::Deserialize;

use super::error::ConfigError;

/// Tuning knobs of a [`Project`](super::Project).
///
/// ```
/// use cppmodel::hir::ModelConfig;
///
/// let config = ModelConfig::from_json(r#"{ "recursion_limit": 16 }"#).unwrap();
/// assert_eq!(config.recursion_limit, 16);
/// assert!(config.instantiation_cache);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Maximum nesting of resolution steps before a lookup gives up.
    pub recursion_limit: u32,
    /// Share instantiations of structurally equal argument lists.
    pub instantiation_cache: bool,
    /// Hide declarations from files the requesting file does not include.
    pub visibility_check: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 64,
            instantiation_cache: true,
            visibility_check: true,
        }
    }
}

impl ModelConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recursion_limit == 0 {
            return Err(ConfigError::ZeroRecursionLimit);
        }
        Ok(())
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_instantiation_cache(mut self, enabled: bool) -> Self {
        self.instantiation_cache = enabled;
        self
    }

    pub fn with_visibility_check(mut self, enabled: bool) -> Self {
        self.visibility_check = enabled;
        self
    }
}
