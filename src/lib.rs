/*!
 * Orbit - bidirectional file synchronization decision engine
 *
 * Given two scanned directory trees and the last-synchronized state from a
 * previous run, decides per item whether to copy left, copy right, delete,
 * leave alone, or flag a conflict; detects moves/renames across runs;
 * applies include/exclude filtering; and carries out manual bulk copy-to
 * and delete-with-recycle operations over the same decision model.
 *
 * The legacy single-direction copy pipeline in [`core`] remains available
 * for simple one-shot transfers that don't need the full sync engine.
 */

pub mod audit;
pub mod cli_progress;
pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod instrumentation;
pub mod logging;
pub mod output;
pub mod stats;
pub mod sync;
pub mod system;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use config::{AuditFormat, CompressionType, CopyConfig, CopyMode, LogLevel, SymlinkMode};
pub use core::{copy_file, copy_file_with_stats, CopyStats};
pub use error::{ErrorCategory, OrbitError, Result};
pub use instrumentation::{OperationStats, StatsSnapshot};
pub use stats::TransferStats;
pub use system::LocalSystem;
pub use sync::{
    BaseFolderPair, Category, FilePair, FolderPair, SyncDirection, SyncEngine, SyncItem, SyncPolicy,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
