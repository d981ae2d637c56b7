//! Manual "copy to alternate folder": take an arbitrary set of items
//! (usually a user's selection in the UI, independent of the sync decision
//! tree) and copy them to a destination folder on a possibly different
//! device, preserving relative structure.

use crate::error::{OrbitError, Result};
use crate::sync::callback::{ErrorResponse, Phase, SyncCallback};
use orbit_core_interface::{CopyProgress, ItemType, OrbitSystem, RelPath};
use std::sync::Arc;

/// One item to copy: its relative path under the source root and its type,
/// so the caller doesn't need a live source listing to drive the copy.
#[derive(Debug, Clone)]
pub struct CopyToItem {
    pub rel_path: RelPath,
    pub item_type: ItemType,
}

#[derive(Debug, Clone, Default)]
pub struct CopyToOutcome {
    pub copied: Vec<RelPath>,
    pub skipped_existing: Vec<RelPath>,
    pub failed: Vec<(RelPath, String)>,
}

/// Copies `items`, rooted at `src_root` on `src`, into `dst_root` on `dst`,
/// recreating folders as needed.
///
/// When `overwrite_if_exists` is `false` (the default manual "copy to
/// folder" behavior), an existing destination item is left alone and
/// recorded as skipped rather than overwritten. When `true`, an existing
/// destination file or symlink is deleted first so the transactional copy
/// (which requires its target to be absent) can proceed -- folders are
/// never deleted first, an existing folder target is simply reused.
pub async fn copy_to(
    src: &Arc<dyn OrbitSystem>,
    dst: &Arc<dyn OrbitSystem>,
    src_root: &RelPath,
    dst_root: &RelPath,
    items: &[CopyToItem],
    progress: &(dyn CopyProgress),
    callback: &dyn SyncCallback,
) -> Result<CopyToOutcome> {
    copy_to_with_overwrite(src, dst, src_root, dst_root, items, progress, false, callback).await
}

/// Same as [`copy_to`] but with `overwrite_if_exists` exposed, matching the
/// bulk copy-to-alternate-folder operation's full parameter set.
pub async fn copy_to_with_overwrite(
    src: &Arc<dyn OrbitSystem>,
    dst: &Arc<dyn OrbitSystem>,
    src_root: &RelPath,
    dst_root: &RelPath,
    items: &[CopyToItem],
    progress: &(dyn CopyProgress),
    overwrite_if_exists: bool,
    callback: &dyn SyncCallback,
) -> Result<CopyToOutcome> {
    let mut outcome = CopyToOutcome::default();
    callback.init_new_phase(Phase::Synchronizing, Some(items.len() as u64));
    tracing::info!(items = items.len(), "copy_to: synchronizing start");

    for item in items {
        let rel = src_root_relative(src_root, &item.rel_path);
        let dst_path = dst_root.join_name(rel.as_str());

        let already_there = dst
            .item_still_exists(&dst_path)
            .await
            .map_err(OrbitError::from)?
            .is_some();

        if already_there && !overwrite_if_exists && item.item_type != ItemType::Folder {
            outcome.skipped_existing.push(item.rel_path.clone());
            continue;
        }

        let kind = match item.item_type {
            ItemType::Folder => "folder",
            ItemType::Symlink => "symlink",
            ItemType::File => "file",
        };
        callback.update_status(&format!("copying {kind} {}", item.rel_path.as_str()));

        loop {
            let result = copy_one_item(src, dst, item, &dst_path, already_there, progress).await;
            match result {
                Ok(()) => {
                    outcome.copied.push(item.rel_path.clone());
                    break;
                }
                Err(e) => match callback.report_error(&format!("failed to copy {}: {e}", item.rel_path.as_str())) {
                    ErrorResponse::Retry => continue,
                    ErrorResponse::Ignore => {
                        outcome.failed.push((item.rel_path.clone(), e.to_string()));
                        break;
                    }
                    ErrorResponse::Abort => return Err(e),
                },
            }
        }
    }

    tracing::info!(
        copied = outcome.copied.len(),
        failed = outcome.failed.len(),
        "copy_to: synchronizing done"
    );
    Ok(outcome)
}

async fn copy_one_item(
    src: &Arc<dyn OrbitSystem>,
    dst: &Arc<dyn OrbitSystem>,
    item: &CopyToItem,
    dst_path: &RelPath,
    already_there: bool,
    progress: &(dyn CopyProgress),
) -> Result<()> {
    match item.item_type {
        ItemType::Folder => dst
            .create_folder_if_missing_recursively(dst_path)
            .await
            .map(|_| ())
            .map_err(OrbitError::from),
        ItemType::Symlink => {
            if let Some(parent) = dst_path.parent() {
                dst.create_folder_if_missing_recursively(&parent)
                    .await
                    .map_err(OrbitError::from)?;
            }
            if already_there {
                dst.remove_symlink_plain(dst_path)
                    .await
                    .map_err(OrbitError::from)?;
            }
            src.copy_symlink(&item.rel_path, dst_path)
                .await
                .map_err(OrbitError::from)
        }
        ItemType::File => {
            if let Some(parent) = dst_path.parent() {
                dst.create_folder_if_missing_recursively(&parent)
                    .await
                    .map_err(OrbitError::from)?;
            }
            if already_there {
                dst.remove_file_plain(dst_path)
                    .await
                    .map_err(OrbitError::from)?;
            }
            copy_file_cross_device(src, dst, &item.rel_path, dst_path, progress).await
        }
    }
}

fn src_root_relative(src_root: &RelPath, path: &RelPath) -> RelPath {
    if path.starts_with(src_root) && !src_root.is_root() {
        RelPath::new(
            path.as_str()
                .strip_prefix(src_root.as_str())
                .and_then(|s| s.strip_prefix('/'))
                .unwrap_or(path.as_str()),
        )
    } else {
        path.clone()
    }
}

/// Same-device copies use `OrbitSystem::copy_new_file` directly; otherwise
/// stream through this process via `open_input`/`open_output`, since no
/// device can read another's byte stream without a generic fallback.
async fn copy_file_cross_device(
    src: &Arc<dyn OrbitSystem>,
    dst: &Arc<dyn OrbitSystem>,
    src_path: &RelPath,
    dst_path: &RelPath,
    progress: &(dyn CopyProgress),
) -> Result<()> {
    if src.is_equivalent(dst.as_ref()) {
        src.copy_new_file(src_path, dst_path, progress)
            .await
            .map(|_| ())
            .map_err(OrbitError::from)
    } else {
        let attrs = src.file_attrs(src_path).await.map_err(OrbitError::from)?;
        let mut reader = src.open_input(src_path).await.map_err(OrbitError::from)?;
        let mut writer = dst
            .open_output(dst_path, Some(attrs.size), Some(attrs.mod_time))
            .await
            .map_err(OrbitError::from)?;
        let copied = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| OrbitError::Io(e))?;
        use tokio::io::AsyncWriteExt;
        writer.shutdown().await.map_err(OrbitError::Io)?;
        progress.on_bytes(copied);
        Ok(())
    }
}
