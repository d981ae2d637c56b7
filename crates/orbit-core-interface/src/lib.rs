//! Device/Path abstraction for the synchronization engine.
//!
//! Every decision the engine makes — what category a pair falls into, which
//! direction to resolve it, whether two one-sided items are really a move —
//! is computed over plain attribute structs. Acting on a decision (copying,
//! deleting, renaming) goes through the `OrbitSystem` trait defined here, so
//! the same decision code drives a native disk, an SSH share, or an S3
//! bucket without caring which one it got.
//!
//! # Design
//!
//! - [`RelPath`] is a device-relative, forward-slash-normalized sequence of
//!   name components. It never carries a leading or trailing separator and
//!   is never itself case-folded or Unicode-normalized — that happens only
//!   at comparison time, one layer up, so storage keys stay exact.
//! - [`OrbitSystem`] is the polymorphic device. Implementors declare a
//!   `device_kind()` and an `identity()`; two devices are *equivalent* iff
//!   comparing those says so. Operations that need two paths at once
//!   (`move_and_rename`, `copy_symlink`, `copy_new_folder`) check
//!   equivalence first and report [`OrbitSystemError::MoveUnsupported`] /
//!   `OperationNotSupported` when the devices differ, so callers can fall
//!   back to generic copy-then-delete.
//! - All operations are async so that blocking network calls (auth
//!   handshakes, spin-up latency) can be polled cooperatively by a host
//!   that wants to pump UI updates while waiting.

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, SystemTime};
use thiserror::Error;

mod path;
mod traverse;

pub use path::RelPath;
pub use traverse::{ErrorDecision, FolderTraverser, TraverseErrorContext};

#[derive(Error, Debug)]
pub enum OrbitSystemError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("target already exists: {0}")]
    TargetExisting(String),

    #[error("source is locked: {0}")]
    FileLocked(String),

    #[error("move unsupported across devices: {0}")]
    MoveUnsupported(String),

    #[error("operation not supported by this device: {operation} on {device}")]
    OperationNotSupported { device: String, operation: String },

    #[error("operation timed out after {0:?}")]
    OperationTimeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    System(String),
}

pub type Result<T> = std::result::Result<T, OrbitSystemError>;

/// What kind of filesystem object a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    File,
    Folder,
    Symlink,
}

/// Attributes recorded for a file on one side of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttrs {
    pub name: String,
    pub size: u64,
    pub mod_time: i64,
    /// Device-persistent identifier (inode-like). 0 = unknown/unsupported.
    pub file_print: u64,
    pub is_followed_symlink: bool,
}

/// Attributes recorded for a folder on one side of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderAttrs {
    pub name: String,
    pub is_followed_symlink: bool,
}

/// Attributes recorded for a symlink on one side of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkAttrs {
    pub name: String,
    pub mod_time: i64,
}

/// A directory entry as seen during a single, non-recursive listing.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub item_type: ItemType,
}

/// Result of [`OrbitSystem::copy_new_file`].
///
/// Mirrors the source's "mixed exceptions and out-of-band result fields"
/// style: a failure to preserve the modification time is not fatal, so it
/// rides along here instead of aborting the copy.
#[derive(Debug, Clone)]
pub struct FileCopyResult {
    pub bytes_copied: u64,
    pub src_file_print: u64,
    pub dst_file_print: u64,
    pub mod_time_error: Option<String>,
}

/// Progress sink for [`OrbitSystem::copy_new_file`]; returning `false` aborts the copy.
pub trait CopyProgress: Send + Sync {
    fn on_bytes(&self, delta: u64) -> bool;
}

/// A `CopyProgress` that never reports cancellation.
pub struct NoopProgress;
impl CopyProgress for NoopProgress {
    fn on_bytes(&self, _delta: u64) -> bool {
        true
    }
}

pub type AsyncReader = Box<dyn tokio::io::AsyncRead + Unpin + Send>;
pub type AsyncWriter = Box<dyn tokio::io::AsyncWrite + Unpin + Send>;

/// The Universal Device Interface.
///
/// Implementations must be `Send + Sync + 'static` so handles can be shared
/// (reference-counted) across the engine's worker thread and any background
/// traversal tasks.
#[async_trait]
pub trait OrbitSystem: Send + Sync + 'static {
    /// Stable label identifying the backend, e.g. `"local"`, `"ssh"`, `"s3"`.
    fn device_kind(&self) -> &str;

    /// Opaque identity used for the equivalence check below (e.g. a
    /// canonicalized root path, or host+bucket for remotes).
    fn identity(&self) -> String;

    /// Two devices are equivalent iff they are the same kind and the same
    /// identity. Equivalent devices support `move_and_rename` and other
    /// two-path operations directly; non-equivalent ones must decompose to
    /// copy+delete.
    fn is_equivalent(&self, other: &dyn OrbitSystem) -> bool {
        self.device_kind() == other.device_kind() && self.identity() == other.identity()
    }

    /// Fast type probe. Does not distinguish "missing" from "error" —
    /// callers that need that distinction use `item_still_exists`.
    async fn get_item_type(&self, path: &RelPath) -> Result<ItemType>;

    /// Case-sensitive existence probe that walks ancestors explicitly, so
    /// it can reliably report "definitely not there" even when
    /// `get_item_type` merely errored (e.g. after a transient failure).
    async fn item_still_exists(&self, path: &RelPath) -> Result<Option<ItemType>>;

    async fn file_attrs(&self, path: &RelPath) -> Result<FileAttrs>;
    async fn folder_attrs(&self, path: &RelPath) -> Result<FolderAttrs>;
    async fn symlink_attrs(&self, path: &RelPath) -> Result<SymlinkAttrs>;

    /// Non-recursive listing of direct children.
    async fn read_dir(&self, path: &RelPath) -> Result<Vec<DirEntry>>;

    /// Fails with `TargetExisting` if `path` already exists.
    async fn create_folder_plain(&self, path: &RelPath) -> Result<()>;

    /// Creates `path` and any missing ancestors. Returns `true` if the
    /// folder already existed (tolerates racing creators rather than
    /// erroring).
    async fn create_folder_if_missing_recursively(&self, path: &RelPath) -> Result<bool>;

    async fn remove_file_plain(&self, path: &RelPath) -> Result<()>;
    async fn remove_symlink_plain(&self, path: &RelPath) -> Result<()>;
    async fn remove_folder_plain(&self, path: &RelPath) -> Result<()>;

    /// Recursive delete using deferred-recursion traversal: list children,
    /// delete files, then symlinks, then recurse into subfolders, then the
    /// folder itself — so stack depth stays bounded by tree depth, not by
    /// the number of entries at any one level.
    ///
    /// `on_before_file`/`on_before_folder` are fired with the relative path
    /// just before each item is removed, for logging.
    async fn remove_folder_if_exists_recursively(
        &self,
        path: &RelPath,
        on_before_file: &(dyn Fn(&RelPath) + Sync),
        on_before_folder: &(dyn Fn(&RelPath) + Sync),
    ) -> Result<()> {
        if self.item_still_exists(path).await?.is_none() {
            return Ok(());
        }
        let entries = self.read_dir(path).await?;
        let (files, rest): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.item_type == ItemType::File);
        let (symlinks, folders): (Vec<_>, Vec<_>) = rest
            .into_iter()
            .partition(|e| e.item_type == ItemType::Symlink);

        for entry in files {
            let child = path.join_name(&entry.name);
            on_before_file(&child);
            self.remove_file_plain(&child).await?;
        }
        for entry in symlinks {
            let child = path.join_name(&entry.name);
            on_before_file(&child);
            self.remove_symlink_plain(&child).await?;
        }
        for entry in folders {
            let child = path.join_name(&entry.name);
            Box::pin(self.remove_folder_if_exists_recursively(
                &child,
                on_before_file,
                on_before_folder,
            ))
            .await?;
        }
        on_before_folder(path);
        self.remove_folder_plain(path).await?;
        Ok(())
    }

    /// Atomic rename within this device. Callers must have already checked
    /// `is_equivalent` for the (possibly different) destination device; this
    /// method assumes `to` lives on `self`.
    ///
    /// When `replace_existing` is `false` and `from`/`to` resolve to the
    /// same underlying file (by file-print), the rename is still accepted
    /// — an idempotent no-op rename should not fail.
    async fn move_and_rename(
        &self,
        from: &RelPath,
        to: &RelPath,
        replace_existing: bool,
    ) -> Result<()>;

    async fn open_input(&self, path: &RelPath) -> Result<AsyncReader>;
    async fn open_output(
        &self,
        path: &RelPath,
        size_hint: Option<u64>,
        mod_time: Option<i64>,
    ) -> Result<AsyncWriter>;

    /// `dst` must not already exist. Preallocates the destination size when
    /// the backend supports it, writes, then *closes the destination
    /// before* setting its modification time (some network shares reject a
    /// mtime change on a still-open handle). Captures both sides'
    /// file-prints for move detection; a failure to set the mod-time is
    /// returned as a non-fatal anomaly in [`FileCopyResult`] rather than as
    /// an error.
    async fn copy_new_file(
        &self,
        src: &RelPath,
        dst: &RelPath,
        progress: &(dyn CopyProgress),
    ) -> Result<FileCopyResult>;

    async fn copy_symlink(&self, src: &RelPath, dst: &RelPath) -> Result<()>;

    /// Copies owner+mode from `src` to `dst`. Mode is skipped for symlinks.
    async fn copy_item_permissions(
        &self,
        src: &RelPath,
        dst: &RelPath,
        item_type: ItemType,
    ) -> Result<()>;

    async fn get_free_disk_space(&self, path: &RelPath) -> Result<u64>;

    fn supports_recycle_bin(&self) -> bool {
        false
    }

    async fn recycle_item_if_exists(&self, path: &RelPath) -> Result<()> {
        let _ = path;
        Err(OrbitSystemError::OperationNotSupported {
            device: self.device_kind().to_string(),
            operation: "recycle_item_if_exists".to_string(),
        })
    }

    /// Recursively walks `roots`, dispatching file/folder/symlink events to
    /// `traverser`. `parallel_ops` bounds how many subfolders are walked
    /// concurrently (folder-level fan-out only; the engine itself stays
    /// single-threaded).
    async fn traverse_folder_recursive(
        &self,
        roots: Vec<(RelPath, Box<dyn FolderTraverser>)>,
        parallel_ops: usize,
    ) -> Result<()>
    where
        Self: Sized,
    {
        traverse::run(self, roots, parallel_ops.max(1)).await
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(20)
    }
}

impl fmt::Debug for dyn OrbitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrbitSystem({}:{})", self.device_kind(), self.identity())
    }
}

/// Current time as whole seconds since the epoch, the unit `mod_time`
/// attributes are stored in throughout this crate.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(&'static str);
    #[async_trait]
    impl OrbitSystem for Dummy {
        fn device_kind(&self) -> &str {
            "dummy"
        }
        fn identity(&self) -> String {
            self.0.to_string()
        }
        async fn get_item_type(&self, _: &RelPath) -> Result<ItemType> {
            unimplemented!()
        }
        async fn item_still_exists(&self, _: &RelPath) -> Result<Option<ItemType>> {
            unimplemented!()
        }
        async fn file_attrs(&self, _: &RelPath) -> Result<FileAttrs> {
            unimplemented!()
        }
        async fn folder_attrs(&self, _: &RelPath) -> Result<FolderAttrs> {
            unimplemented!()
        }
        async fn symlink_attrs(&self, _: &RelPath) -> Result<SymlinkAttrs> {
            unimplemented!()
        }
        async fn read_dir(&self, _: &RelPath) -> Result<Vec<DirEntry>> {
            unimplemented!()
        }
        async fn create_folder_plain(&self, _: &RelPath) -> Result<()> {
            unimplemented!()
        }
        async fn create_folder_if_missing_recursively(&self, _: &RelPath) -> Result<bool> {
            unimplemented!()
        }
        async fn remove_file_plain(&self, _: &RelPath) -> Result<()> {
            unimplemented!()
        }
        async fn remove_symlink_plain(&self, _: &RelPath) -> Result<()> {
            unimplemented!()
        }
        async fn remove_folder_plain(&self, _: &RelPath) -> Result<()> {
            unimplemented!()
        }
        async fn move_and_rename(&self, _: &RelPath, _: &RelPath, _: bool) -> Result<()> {
            unimplemented!()
        }
        async fn open_input(&self, _: &RelPath) -> Result<AsyncReader> {
            unimplemented!()
        }
        async fn open_output(
            &self,
            _: &RelPath,
            _: Option<u64>,
            _: Option<i64>,
        ) -> Result<AsyncWriter> {
            unimplemented!()
        }
        async fn copy_new_file(
            &self,
            _: &RelPath,
            _: &RelPath,
            _: &(dyn CopyProgress),
        ) -> Result<FileCopyResult> {
            unimplemented!()
        }
        async fn copy_symlink(&self, _: &RelPath, _: &RelPath) -> Result<()> {
            unimplemented!()
        }
        async fn copy_item_permissions(
            &self,
            _: &RelPath,
            _: &RelPath,
            _: ItemType,
        ) -> Result<()> {
            unimplemented!()
        }
        async fn get_free_disk_space(&self, _: &RelPath) -> Result<u64> {
            unimplemented!()
        }
    }

    #[test]
    fn equivalence_requires_same_kind_and_identity() {
        let a = Dummy("/srv/data");
        let b = Dummy("/srv/data");
        let c = Dummy("/srv/other");
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }
}
