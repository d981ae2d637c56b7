use crate::{DirEntry, FileAttrs, FolderAttrs, ItemType, OrbitSystem, RelPath, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What to do when a single item fails to traverse (permission error, a
/// file vanishing mid-scan, a broken remote connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    Retry,
    Skip,
    Abort,
}

/// Context handed to [`FolderTraverser::on_error`] describing what failed.
#[derive(Debug, Clone)]
pub struct TraverseErrorContext {
    pub path: RelPath,
    pub message: String,
}

/// Sink for events produced by [`OrbitSystem::traverse_folder_recursive`].
///
/// Implementors build up a scanned tree (or feed one side of a comparison)
/// as the device is walked. All callbacks are synchronous from the
/// traversal's point of view — `on_folder` returning `false` prunes that
/// subtree without visiting its children, which lets a filter engine stop a
/// walk early using `child_might_match`-style hints computed from the path
/// alone.
#[async_trait]
pub trait FolderTraverser: Send + Sync {
    /// Called once per file found. `parent` is the folder it lives in.
    fn on_file(&self, parent: &RelPath, attrs: FileAttrs);

    /// Called once per folder found, before its children are visited.
    /// Returning `false` skips descending into it.
    fn on_folder(&self, parent: &RelPath, attrs: FolderAttrs) -> bool;

    /// Called once per symlink found. Symlinks are never descended into by
    /// the traversal itself, regardless of what they point at.
    fn on_symlink(&self, parent: &RelPath, name: &str);

    /// Called when listing or stat-ing `ctx.path` fails. The traversal
    /// honors the returned decision: `Retry` re-attempts once, `Skip`
    /// treats the item as absent and continues, `Abort` stops the whole
    /// walk and propagates the underlying error.
    fn on_error(&self, ctx: &TraverseErrorContext) -> ErrorDecision;
}

/// Walks `roots` breadth-first per root, fanning out across subfolders up
/// to `parallel_ops` at a time. Each root keeps its own traverser so a
/// two-sided scan (left tree / right tree) can share this single call.
pub async fn run<S>(
    system: &S,
    roots: Vec<(RelPath, Box<dyn FolderTraverser>)>,
    parallel_ops: usize,
) -> Result<()>
where
    S: OrbitSystem + ?Sized,
{
    let semaphore = Arc::new(Semaphore::new(parallel_ops.max(1)));
    for (root, traverser) in roots {
        let traverser: Arc<dyn FolderTraverser> = Arc::from(traverser);
        walk_folder(system, root, traverser, semaphore.clone()).await?;
    }
    Ok(())
}

fn walk_folder<'a, S>(
    system: &'a S,
    folder: RelPath,
    traverser: Arc<dyn FolderTraverser>,
    semaphore: Arc<Semaphore>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>
where
    S: OrbitSystem + ?Sized,
{
    Box::pin(async move {
        let entries = match list_with_retry(system, &folder, &traverser).await? {
            Some(entries) => entries,
            None => return Ok(()),
        };

        let mut subfolders = Vec::new();
        for entry in entries {
            let child = folder.join_name(&entry.name);
            match entry.item_type {
                ItemType::File => {
                    if let Some(attrs) = fetch_file_attrs(system, &child, &traverser).await? {
                        traverser.on_file(&folder, attrs);
                    }
                }
                ItemType::Symlink => {
                    traverser.on_symlink(&folder, &entry.name);
                }
                ItemType::Folder => {
                    if let Some(attrs) = fetch_folder_attrs(system, &child, &traverser).await? {
                        if traverser.on_folder(&folder, attrs) {
                            subfolders.push(child);
                        }
                    }
                }
            }
        }

        let mut tasks = Vec::with_capacity(subfolders.len());
        for sub in subfolders {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore open");
            let fut = walk_folder(system, sub, traverser.clone(), semaphore.clone());
            tasks.push(async move {
                let result = fut.await;
                drop(permit);
                result
            });
        }
        for result in futures::future::join_all(tasks).await {
            result?;
        }
        Ok(())
    })
}

async fn list_with_retry<S>(
    system: &S,
    path: &RelPath,
    traverser: &Arc<dyn FolderTraverser>,
) -> Result<Option<Vec<DirEntry>>>
where
    S: OrbitSystem + ?Sized,
{
    loop {
        match system.read_dir(path).await {
            Ok(entries) => return Ok(Some(entries)),
            Err(e) => {
                let ctx = TraverseErrorContext {
                    path: path.clone(),
                    message: e.to_string(),
                };
                match traverser.on_error(&ctx) {
                    ErrorDecision::Retry => continue,
                    ErrorDecision::Skip => return Ok(None),
                    ErrorDecision::Abort => return Err(e),
                }
            }
        }
    }
}

async fn fetch_file_attrs<S>(
    system: &S,
    path: &RelPath,
    traverser: &Arc<dyn FolderTraverser>,
) -> Result<Option<FileAttrs>>
where
    S: OrbitSystem + ?Sized,
{
    loop {
        match system.file_attrs(path).await {
            Ok(attrs) => return Ok(Some(attrs)),
            Err(e) => {
                let ctx = TraverseErrorContext {
                    path: path.clone(),
                    message: e.to_string(),
                };
                match traverser.on_error(&ctx) {
                    ErrorDecision::Retry => continue,
                    ErrorDecision::Skip => return Ok(None),
                    ErrorDecision::Abort => return Err(e),
                }
            }
        }
    }
}

async fn fetch_folder_attrs<S>(
    system: &S,
    path: &RelPath,
    traverser: &Arc<dyn FolderTraverser>,
) -> Result<Option<FolderAttrs>>
where
    S: OrbitSystem + ?Sized,
{
    loop {
        match system.folder_attrs(path).await {
            Ok(attrs) => return Ok(Some(attrs)),
            Err(e) => {
                let ctx = TraverseErrorContext {
                    path: path.clone(),
                    message: e.to_string(),
                };
                match traverser.on_error(&ctx) {
                    ErrorDecision::Retry => continue,
                    ErrorDecision::Skip => return Ok(None),
                    ErrorDecision::Abort => return Err(e),
                }
            }
        }
    }
}
