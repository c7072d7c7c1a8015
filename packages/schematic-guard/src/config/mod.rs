//! Configuration System
//!
//! - `GuardConfig`: versioned YAML schema (v1) with range validation
//! - `ConfigHandle`: process-wide snapshot holder, hot-reloadable
//! - `GuardPaths`: deployment layout (`schematics/uploaded`, `schematics/anomaly`)
//!
//! # Examples
//!
//! ```rust,ignore
//! use schematic_guard::config::{ConfigHandle, GuardConfig};
//!
//! let handle = ConfigHandle::new(GuardConfig::from_yaml("guard.yaml")?);
//! let snapshot = handle.snapshot();
//! ```

pub mod error;
pub mod guard_config;
pub mod handle;
pub mod paths;

pub use error::{ConfigError, ConfigResult};
pub use guard_config::{GuardConfig, RetryConfig, SanitizeConfig};
pub use handle::{ConfigHandle, KeywordPolicy, KeywordPolicySource};
pub use paths::GuardPaths;
