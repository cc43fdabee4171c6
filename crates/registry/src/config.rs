//! Registry configuration.
//!
//! ```toml
//! scan-cost-threshold-ms = 100
//! always-use-cache = false
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Scans slower than this make [`crate::OwnerLookup::Auto`] trust the cache.
pub const DEFAULT_SCAN_COST_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryConfig {
	pub scan_cost_threshold_ms: u64,
	/// Answer owner queries from the cache whenever it is non-empty.
	pub always_use_cache: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			scan_cost_threshold_ms: DEFAULT_SCAN_COST_THRESHOLD_MS,
			always_use_cache: false,
		}
	}
}

impl RegistryConfig {
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(src)?)
	}

	pub fn with_scan_cost_threshold(mut self, threshold: Duration) -> Self {
		self.scan_cost_threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
		self
	}

	pub fn with_always_use_cache(mut self, always: bool) -> Self {
		self.always_use_cache = always;
		self
	}

	pub fn scan_cost_threshold(&self) -> Duration {
		Duration::from_millis(self.scan_cost_threshold_ms)
	}
}
