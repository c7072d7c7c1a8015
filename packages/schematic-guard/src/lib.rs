/*
 * Schematic Guard - upload directory sanitizer for schematic documents
 *
 * Feature-First Hexagonal Architecture:
 * - features/nbt          : Document codec (gzip + named binary tags)
 * - features/sanitizer    : Pure tree pruning + banned keyword scan
 * - features/loader       : Locked, classified document loading
 * - features/quarantine   : Quarantine copy + truncate / atomic rewrite
 * - features/processor    : Retry orchestration + batch scan
 * - features/file_watcher : Directory watch tree + debounce scheduler
 *
 * Flow:
 *   watch tree → debounce → host executor → processor
 *     → loader → sanitizer → quarantine
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (versioned YAML + hot-reload handle)
pub mod config;

/// Error types
pub mod errors;

/// Feature modules
pub mod features;

/// Watcher lifecycle wiring
pub mod service;

/// Subscriber setup for the binary
pub mod telemetry;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigHandle, GuardConfig, GuardPaths, KeywordPolicy, KeywordPolicySource};
pub use errors::{ErrorCategory, GuardError, Result};
pub use features::file_watcher::{
    DebounceScheduler, HostExecutor, HostLoop, ImmediateExecutor, SerialExecutor, WatchTree,
};
pub use features::loader::{DocumentLoader, DocumentSource};
pub use features::nbt::{DocumentCodec, GzipNbtCodec, NbtCompound, NbtDocument, NbtList, Tag};
pub use features::quarantine::{AnomalyNotifier, LogNotifier, QuarantineAction, QuarantineManager};
pub use features::processor::{scan_all, ProcessOutcome, ScanReport, SchematicProcessor};
pub use features::sanitizer::{SanitizePolicy, SanitizeVerdict, Sanitizer};
pub use service::{build_processor, SchematicGuard};
