//! Hot-reloadable configuration snapshot
//!
//! The sanitizer asks a [`KeywordPolicySource`] for a fresh policy on every
//! pass, so a reload takes effect on the next processed file.

use super::error::ConfigResult;
use super::guard_config::GuardConfig;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Banned keyword settings for one sanitize pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPolicy {
    enabled: bool,
    /// Lower-cased, de-duplicated, original order
    keywords: Vec<String>,
}

impl KeywordPolicy {
    pub fn new<I, S>(enabled: bool, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let lower = keyword.as_ref().to_lowercase();
            if !normalized.contains(&lower) {
                normalized.push(lower);
            }
        }
        Self {
            enabled,
            keywords: normalized,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            keywords: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Scan is skipped when disabled or when there is nothing to look for
    pub fn is_active(&self) -> bool {
        self.enabled && !self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Port: where the sanitizer reads keyword settings from
pub trait KeywordPolicySource: Send + Sync {
    fn keyword_policy(&self) -> KeywordPolicy;
}

/// Fixed policy (tests, one-shot scans)
impl KeywordPolicySource for KeywordPolicy {
    fn keyword_policy(&self) -> KeywordPolicy {
        self.clone()
    }
}

/// Process-wide configuration holder
///
/// Readers take a cheap `Arc` snapshot; reloads swap the whole snapshot.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<GuardConfig>>,
}

impl ConfigHandle {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<GuardConfig> {
        self.current.read().clone()
    }

    /// Swap in a new configuration after validating it
    pub fn replace(&self, config: GuardConfig) -> ConfigResult<()> {
        config.validate()?;
        *self.current.write() = Arc::new(config);
        Ok(())
    }

    /// Re-read a YAML file; on error the previous snapshot stays active
    pub fn reload_from_yaml(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let config = GuardConfig::from_yaml(path)?;
        *self.current.write() = Arc::new(config);
        tracing::info!("Reloaded configuration from {}", path.display());
        Ok(())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

impl KeywordPolicySource for ConfigHandle {
    fn keyword_policy(&self) -> KeywordPolicy {
        self.snapshot().keyword_policy()
    }
}
