/// Engine configuration
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::ConfigError;

/// Tunables for the progress engine and its cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressConfig {
    /// Uploader role whose documents count for marketing-sourced students
    pub counselor_role: String,
    /// Extra country spellings, mapped to their canonical name
    pub country_aliases: HashMap<String, String>,
    /// Lifetime of memoized reports
    pub cache_ttl_secs: u64,
    /// Most students the report cache holds at once
    pub cache_max_students: usize,
    /// How often the server drops stale reports
    pub cache_sweep_secs: u64,
}

impl ProgressConfig {
    /// Loads configuration from a JSON file
    ///
    /// Missing fields take their defaults.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON file
    ///
    /// # Returns
    /// * `Ok(ProgressConfig)` - Loaded configuration
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sweep period, at least one second.
    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_secs.max(1))
    }

    /// Returns true if the role matches the configured counselor role.
    pub fn is_counselor(&self, role: &str) -> bool {
        role.trim().eq_ignore_ascii_case(&self.counselor_role)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            counselor_role: "counselor".to_string(),
            country_aliases: HashMap::new(),
            cache_ttl_secs: 5 * 60,
            cache_max_students: 10_000,
            cache_sweep_secs: 60,
        }
    }
}
