#![forbid(unsafe_code)]

//! Binding configuration.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `VIREO_DEEP_BINDINGS` | `deep_attribute_bindings` | `true` |
//! | `VIREO_WARN_UNKNOWN` | `warn_unknown_attributes` | `true` |
//! | `VIREO_MAX_RANGE` | `max_range_len` | `100000` |

use std::env;

use vireo_runtime::config::parse_var;

/// Tuning for [`BindingManager`](crate::BindingManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    /// Attribute bindings watch their expression deeply, so writes inside
    /// a bound object re-apply the attribute.
    pub deep_attribute_bindings: bool,
    /// Log attributes that are neither static nor a known binding form.
    pub warn_unknown_attributes: bool,
    /// Largest numeric `:for` range; longer ranges render no rows.
    pub max_range_len: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            deep_attribute_bindings: true,
            warn_unknown_attributes: true,
            max_range_len: 100_000,
        }
    }
}

impl BindingConfig {
    #[must_use]
    pub fn with_deep_attribute_bindings(mut self, deep: bool) -> Self {
        self.deep_attribute_bindings = deep;
        self
    }

    #[must_use]
    pub fn with_warn_unknown_attributes(mut self, warn: bool) -> Self {
        self.warn_unknown_attributes = warn;
        self
    }

    #[must_use]
    pub fn with_max_range_len(mut self, max: usize) -> Self {
        self.max_range_len = max;
        self
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    #[must_use]
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(deep) = parse_var::<bool>(&lookup, "VIREO_DEEP_BINDINGS") {
            config.deep_attribute_bindings = deep;
        }
        if let Some(warn) = parse_var::<bool>(&lookup, "VIREO_WARN_UNKNOWN") {
            config.warn_unknown_attributes = warn;
        }
        if let Some(max) = parse_var::<usize>(&lookup, "VIREO_MAX_RANGE") {
            config.max_range_len = max;
        }
        config
    }
}
