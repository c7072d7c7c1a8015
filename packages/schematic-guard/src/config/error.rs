//! Guard configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting fell outside its accepted window
    #[error("{setting} = {value} is outside {min}..={max} ({hint})")]
    OutOfRange {
        setting: &'static str,
        value: u64,
        min: u64,
        max: u64,
        hint: &'static str,
    },

    #[error("guard config has no 'version' key; start the file with 'version: 1'")]
    MissingVersion,

    #[error("guard config version {found} is not supported by this build (reads {supported:?})")]
    UnsupportedVersion {
        found: u32,
        supported: &'static [u32],
    },

    #[error("could not read guard config: {0}")]
    Read(#[from] std::io::Error),

    /// Bad YAML, a wrong value type, or an unknown key
    #[error("guard config does not parse: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid guard config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn out_of_range(
        setting: &'static str,
        value: impl Into<u64>,
        min: u64,
        max: u64,
        hint: &'static str,
    ) -> Self {
        Self::OutOfRange {
            setting,
            value: value.into(),
            min,
            max,
            hint,
        }
    }
}
