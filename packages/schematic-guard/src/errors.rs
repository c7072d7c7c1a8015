//! Error types for schematic-guard
//!
//! One crate-level error covers the processing pipeline. Each variant maps to
//! an [`ErrorCategory`] that the retry loop consults.

use crate::config::ConfigError;
use crate::features::nbt::NbtError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for schematic-guard operations
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another process holds the file; shared lock could not be taken
    #[error("File is being used by another process: {}", path.display())]
    LockUnavailable { path: PathBuf },

    /// Compressed stream ended early or is corrupt (writer may still be flushing)
    #[error("Truncated or corrupt stream: {0}")]
    TruncatedOrCorruptStream(String),

    /// Not a schematic container (too small, bad magic, malformed tags)
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    /// IO error with context
    #[error("IO error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Watch registration error
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GuardError {
    /// Wrap an IO error with a short description of the failed operation
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GuardError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        GuardError::InvalidFormat(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GuardError::LockUnavailable { .. } | GuardError::TruncatedOrCorruptStream(_) => {
                ErrorCategory::Transient
            }
            GuardError::InvalidFormat(_)
            | GuardError::Io { .. }
            | GuardError::Watch(_)
            | GuardError::Config(_) => ErrorCategory::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Short stable name for log fields
    pub fn kind_name(&self) -> &'static str {
        match self {
            GuardError::LockUnavailable { .. } => "lock_unavailable",
            GuardError::TruncatedOrCorruptStream(_) => "truncated_or_corrupt_stream",
            GuardError::InvalidFormat(_) => "invalid_format",
            GuardError::Io { .. } => "io",
            GuardError::Watch(_) => "watch",
            GuardError::Config(_) => "config",
        }
    }
}

impl From<NbtError> for GuardError {
    fn from(err: NbtError) -> Self {
        match err {
            NbtError::Truncated(msg) => GuardError::TruncatedOrCorruptStream(msg),
            NbtError::CorruptStream(msg) => GuardError::TruncatedOrCorruptStream(msg),
            NbtError::Malformed(msg) => GuardError::InvalidFormat(msg),
            NbtError::Encode(msg) => GuardError::InvalidFormat(format!("encode failed: {}", msg)),
        }
    }
}

/// Error category for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient error - retry automatically (lock contention, partial write)
    Transient,
    /// Permanent error - don't retry (bad format, IO failure while rewriting)
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type alias for schematic-guard operations
pub type Result<T> = std::result::Result<T, GuardError>;
