//! Session configuration.

use serde::{Deserialize, Serialize};
use tablemap_core::{Error, Result};

/// Environment variable holding the table prefix.
pub const ENV_TABLE_PREFIX: &str = "TABLEMAP_TABLE_PREFIX";
/// Environment variable holding the single-owner load warning threshold.
/// `off` or `0` disables tracking.
pub const ENV_N1_THRESHOLD: &str = "TABLEMAP_N1_THRESHOLD";

/// Configuration for a [`crate::Db`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Prepended to the type name before snake-casing, for models without a
    /// table-name override.
    pub table_prefix: String,
    /// Single-owner relationship loads per (owner type, relationship) before
    /// a warning. `None` disables tracking.
    pub n1_threshold: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            n1_threshold: Some(3),
        }
    }
}

impl DbConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table prefix.
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the load tracking threshold.
    pub fn n1_threshold(mut self, threshold: usize) -> Self {
        self.n1_threshold = Some(threshold);
        self
    }

    /// Turn off load tracking.
    pub fn without_load_tracking(mut self) -> Self {
        self.n1_threshold = None;
        self
    }

    /// Defaults overridden by `TABLEMAP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(prefix) = lookup(ENV_TABLE_PREFIX) {
            config.table_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_N1_THRESHOLD) {
            let raw = raw.trim();
            config.n1_threshold = if raw.eq_ignore_ascii_case("off") {
                None
            } else {
                let parsed: usize = raw.parse().map_err(|e| {
                    Error::Config(format!("{ENV_N1_THRESHOLD}=`{raw}` is not a count: {e}"))
                })?;
                (parsed > 0).then_some(parsed)
            };
        }
        Ok(config)
    }
}
