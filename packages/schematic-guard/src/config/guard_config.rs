//! Guard configuration (YAML schema v1)

use super::error::{ConfigError, ConfigResult};
use super::handle::KeywordPolicy;
use crate::features::sanitizer::SanitizePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Top-level configuration
///
/// Every field has a default, so a file containing only `version: 1` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Master switch for the banned keyword scan
    pub enable_keyword_check: bool,

    /// Case-insensitive substrings that neutralize a document when found in any string tag
    pub banned_keywords: Vec<String>,

    /// Extension (without dot) of files the watcher forwards
    pub document_extension: String,

    /// Quiet period after the last observed write before a file is read
    pub stabilization_ms: u64,

    pub retry: RetryConfig,

    pub sanitize: SanitizeConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            version: 1,
            enable_keyword_check: true,
            banned_keywords: vec![
                "minecraft:bedrock".to_string(),
                "minecraft:command_block".to_string(),
            ],
            document_extension: "nbt".to_string(),
            stabilization_ms: 1000,
            retry: RetryConfig::default(),
            sanitize: SanitizeConfig::default(),
        }
    }
}

/// Load retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Delay before retry `n` is `base_delay_ms * n`
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 300,
        }
    }
}

impl RetryConfig {
    /// Backoff after the given 1-based failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }
}

/// Structural pruning policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizeConfig {
    /// Compound key whose children are filtered
    pub reserved_slot: String,
    /// Children of the reserved slot that survive pruning
    pub allowed_attributes: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            reserved_slot: "components".to_string(),
            allowed_attributes: vec![
                "create:clipboard_pages".to_string(),
                "create:clipboard_type".to_string(),
            ],
        }
    }
}

impl GuardConfig {
    /// Load and validate a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        let has_version = raw
            .as_mapping()
            .map(|m| m.contains_key("version"))
            .unwrap_or(false);
        if !has_version {
            return Err(ConfigError::MissingVersion);
        }

        let config: GuardConfig = serde_yaml::from_value(raw)?;
        if !SUPPORTED_VERSIONS.contains(&config.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: SUPPORTED_VERSIONS,
            });
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=60_000).contains(&self.stabilization_ms) {
            return Err(ConfigError::out_of_range(
                "stabilization_ms",
                self.stabilization_ms,
                1,
                60_000,
                "uploads must settle before they are read",
            ));
        }
        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigError::out_of_range(
                "retry.max_attempts",
                self.retry.max_attempts,
                1,
                10,
                "every upload gets at least one load attempt",
            ));
        }
        if self.retry.base_delay_ms > 10_000 {
            return Err(ConfigError::out_of_range(
                "retry.base_delay_ms",
                self.retry.base_delay_ms,
                0,
                10_000,
                "backoff sleeps block the host thread",
            ));
        }
        if self.document_extension.is_empty() || self.document_extension.starts_with('.') {
            return Err(ConfigError::Invalid(
                "document_extension must be non-empty and given without the leading dot"
                    .to_string(),
            ));
        }
        if self.banned_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "banned_keywords must not contain empty entries (an empty keyword matches every string)"
                    .to_string(),
            ));
        }
        if self.sanitize.reserved_slot.is_empty() {
            return Err(ConfigError::Invalid(
                "sanitize.reserved_slot must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stabilization_interval(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    pub fn keyword_policy(&self) -> KeywordPolicy {
        KeywordPolicy::new(self.enable_keyword_check, self.banned_keywords.iter())
    }

    pub fn sanitize_policy(&self) -> SanitizePolicy {
        SanitizePolicy::new(
            self.sanitize.reserved_slot.clone(),
            self.sanitize.allowed_attributes.iter().cloned(),
        )
    }
}
