//! Configuration Management

use crate::interaction::severity::{builtin_categories, KeywordCategory};
use crate::interaction::types::Severity;
use crate::normalize::rxnav::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reference dataset locations
    #[serde(default)]
    pub datasets: DatasetConfig,
    /// Remote drug lookup settings
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Severity classification settings
    #[serde(default)]
    pub severity: SeverityConfig,
}

/// Reference dataset paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// RxNorm concepts file (RXNCONSO.RRF or `rxcui|name` rows)
    pub drug_index: PathBuf,
    /// Interaction table (CSV)
    pub interactions: PathBuf,
    /// Dosage reference table (TOML)
    pub dosage_reference: PathBuf,
}

/// Remote lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Query RxNav when the local index misses
    pub enabled: bool,
    /// RxNav REST base URL
    pub base_url: String,
    /// Per-lookup timeout (ms)
    pub timeout_ms: u64,
    /// Retries per HTTP request
    pub max_retries: u32,
    /// Initial retry backoff (ms)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Concurrent remote lookups per request
    pub max_concurrent: usize,
}

/// Severity classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Tier for records without a severity hint
    pub default_tier: Severity,
    /// High-risk keyword categories
    #[serde(default = "builtin_categories")]
    pub categories: Vec<KeywordCategory>,
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl DatasetConfig {
    /// Default data directory
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".rx_verify").join("data"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Dataset paths inside `dir`
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self {
            drug_index: dir.join("RXNCONSO.RRF"),
            interactions: dir.join("interactions.csv"),
            dosage_reference: dir.join("dosage_reference.toml"),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::in_dir(&Self::data_dir())
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 5000,
            max_retries: 2,
            retry_backoff_ms: default_retry_backoff_ms(),
            max_concurrent: 4,
        }
    }
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            default_tier: Severity::Medium,
            categories: builtin_categories(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.lookup.timeout_ms == 0 {
            return Err(crate::Error::Config("timeout_ms must be > 0".to_string()));
        }
        if self.lookup.max_concurrent == 0 {
            return Err(crate::Error::Config("max_concurrent must be > 0".to_string()));
        }
        if self.lookup.enabled && self.lookup.base_url.trim().is_empty() {
            return Err(crate::Error::Config(
                "base_url must not be empty when lookup is enabled".to_string(),
            ));
        }
        for category in &self.severity.categories {
            if category.name.trim().is_empty() {
                return Err(crate::Error::Config("severity category name must not be empty".to_string()));
            }
            let has_terms = category.keywords.iter().any(|k| !k.trim().is_empty())
                || category.drugs.iter().any(|d| !d.trim().is_empty());
            if !has_terms {
                return Err(crate::Error::Config(format!(
                    "severity category '{}' needs at least one keyword or drug",
                    category.name
                )));
            }
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".rx_verify").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a single value by dotted key (e.g. `lookup.timeout_ms`)
    pub fn get(&self, key: &str) -> Result<String, crate::Error> {
        let value = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let mut current = &value;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| crate::Error::Config(format!("unknown config key '{}'", key)))?;
        }
        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}
