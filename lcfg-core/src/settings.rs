//! Tunable sizing knobs for the hash containers

use crate::{LcfgResult, SettingsError};
use serde::{Deserialize, Serialize};

/// Initial bucket count for a component's resource table.
pub const COMPONENT_DEFAULT_BUCKETS: usize = 79;

/// Initial bucket count for a component set.
pub const COMPSET_DEFAULT_BUCKETS: usize = 113;

/// Load factor targeted after a resize.
pub const LOAD_INIT: f64 = 0.5;

/// Load factor that triggers a resize.
pub const LOAD_MAX: f64 = 0.7;

/// Maximum number of `$` placeholders per template.
pub const TAGS_MAX_DEPTH: usize = 5;

/// Sizing knobs, overridable from the environment.
///
/// These can be used by loaders that know their profile sizes up front to
/// avoid early resizes; the containers fall back to the constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Initial bucket count for components
    pub component_buckets: usize,
    /// Initial bucket count for component sets
    pub compset_buckets: usize,
    /// Load factor targeted after a resize
    pub load_init: f64,
    /// Load factor that triggers a resize
    pub load_max: f64,
    /// Maximum `$` placeholders per template
    pub tags_max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            component_buckets: COMPONENT_DEFAULT_BUCKETS,
            compset_buckets: COMPSET_DEFAULT_BUCKETS,
            load_init: LOAD_INIT,
            load_max: LOAD_MAX,
            tags_max_depth: TAGS_MAX_DEPTH,
        }
    }
}

impl Settings {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `LCFG_COMP_DEFAULT_SIZE`: initial component buckets (default: 79)
    /// - `LCFG_COMPSET_DEFAULT_SIZE`: initial component-set buckets (default: 113)
    /// - `LCFG_TAGS_MAX_DEPTH`: maximum template placeholders (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            component_buckets: std::env::var("LCFG_COMP_DEFAULT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.component_buckets),
            compset_buckets: std::env::var("LCFG_COMPSET_DEFAULT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compset_buckets),
            load_init: defaults.load_init,
            load_max: defaults.load_max,
            tags_max_depth: std::env::var("LCFG_TAGS_MAX_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.tags_max_depth),
        }
    }

    /// Validate the settings.
    ///
    /// Validates:
    /// - bucket counts are non-zero
    /// - `load_init < load_max` and both lie in (0, 1]
    /// - `tags_max_depth` is non-zero
    pub fn validate(&self) -> LcfgResult<()> {
        if self.component_buckets == 0 {
            return Err(SettingsError::InvalidValue {
                field: "component_buckets".to_string(),
                value: "0".to_string(),
                reason: "bucket count must be greater than 0".to_string(),
            }
            .into());
        }

        if self.compset_buckets == 0 {
            return Err(SettingsError::InvalidValue {
                field: "compset_buckets".to_string(),
                value: "0".to_string(),
                reason: "bucket count must be greater than 0".to_string(),
            }
            .into());
        }

        if !(self.load_init > 0.0 && self.load_init < self.load_max && self.load_max <= 1.0) {
            return Err(SettingsError::InvalidValue {
                field: "load_init/load_max".to_string(),
                value: format!("{}/{}", self.load_init, self.load_max),
                reason: "load factors must satisfy 0 < init < max <= 1".to_string(),
            }
            .into());
        }

        if self.tags_max_depth == 0 {
            return Err(SettingsError::InvalidValue {
                field: "tags_max_depth".to_string(),
                value: "0".to_string(),
                reason: "template depth must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
