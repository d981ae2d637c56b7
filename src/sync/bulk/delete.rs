//! Manual "delete with recycle": removes an arbitrary selection of items,
//! preferring the device's recycle bin when it has one and falling back to
//! a permanent delete otherwise.

use super::super::callback::{ErrorResponse, Phase, SyncCallback};
use super::super::direction::SyncDirection;
use super::super::policy::{PolicyDirection, SyncPolicy};
use super::super::tree::{BaseFolderPair, NodeId, PairTree, SyncItem};
use crate::error::{OrbitError, Result};
use orbit_core_interface::{ItemType, OrbitSystem, RelPath};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Use the recycle bin when available, permanent delete otherwise.
    PreferRecycle,
    /// Always delete permanently, even if a recycle bin exists.
    Permanent,
}

#[derive(Debug, Clone)]
pub struct DeleteItem {
    pub rel_path: RelPath,
    pub item_type: ItemType,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOutcome {
    pub recycled: Vec<RelPath>,
    pub deleted: Vec<RelPath>,
    pub failed: Vec<(RelPath, String)>,
}

/// Deletes `items` from `device`. Folders are removed with the deferred
/// recursion the device already implements
/// (`remove_folder_if_exists_recursively`); recycling a folder moves the
/// whole subtree aside in one step instead, so files/symlinks inside it
/// are never individually recycled.
pub async fn delete_items(
    device: &Arc<dyn OrbitSystem>,
    items: &[DeleteItem],
    mode: DeleteMode,
    callback: &dyn SyncCallback,
) -> Result<DeleteOutcome> {
    let mut outcome = DeleteOutcome::default();
    let recycle_available = device.supports_recycle_bin();
    let use_recycle = mode == DeleteMode::PreferRecycle && recycle_available;

    if mode == DeleteMode::PreferRecycle && !recycle_available {
        callback.report_warning("recycle bin missing on these folders, deleting permanently instead");
    }

    callback.init_new_phase(Phase::Synchronizing, Some(items.len() as u64));
    tracing::info!(items = items.len(), use_recycle, "delete_items: synchronizing start");

    for item in items {
        let kind = match item.item_type {
            ItemType::File => "file",
            ItemType::Symlink => "symlink",
            ItemType::Folder => "folder",
        };
        callback.update_status(&format!("removing {kind} {}", item.rel_path.as_str()));

        loop {
            let result = if use_recycle {
                device
                    .recycle_item_if_exists(&item.rel_path)
                    .await
                    .map_err(OrbitError::from)
            } else {
                delete_permanently(device, item).await
            };

            match result {
                Ok(()) if use_recycle => {
                    outcome.recycled.push(item.rel_path.clone());
                    break;
                }
                Ok(()) => {
                    outcome.deleted.push(item.rel_path.clone());
                    break;
                }
                Err(e) => match callback.report_error(&format!("failed to remove {}: {e}", item.rel_path.as_str())) {
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
        recycled = outcome.recycled.len(),
        deleted = outcome.deleted.len(),
        failed = outcome.failed.len(),
        "delete_items: synchronizing done"
    );
    Ok(outcome)
}

/// Which side of a pair a bulk-delete operation removed an item from --
/// the model update in spec.md 4.7 step 5 needs this to know which side's
/// attributes to clear on the corresponding tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedSide {
    Left,
    Right,
}

/// One successfully-deleted tree node, as input to [`reconcile_tree_after_delete`].
#[derive(Debug, Clone, Copy)]
pub struct TreeDeletion {
    pub id: NodeId,
    pub side: DeletedSide,
}

/// Spec.md 4.7 step 5: after a batch of successful deletes, walk the
/// affected nodes -- for a deleted folder, its whole subtree too, since a
/// recursive folder delete removes everything under it on disk in the same
/// step -- clear the deleted side's attributes, re-derive [`SyncDirection`]
/// for anything now empty on exactly one side (away from the empty side
/// under a two-way policy, the configured ex-left-only/ex-right-only slot
/// under one-way), and prune anything now empty on both sides out of the
/// model entirely. Runs after the fact so an aborted batch leaves the model
/// consistent with whatever actually happened on disk.
pub fn reconcile_tree_after_delete(pair: &mut BaseFolderPair, policy: &SyncPolicy, deletions: &[TreeDeletion]) {
    let mut affected: Vec<(NodeId, DeletedSide)> = Vec::new();
    for d in deletions {
        collect_subtree(&pair.tree, d.id, d.side, &mut affected);
    }

    for (id, side) in &affected {
        clear_side(&mut pair.tree, *id, *side);
    }

    let mut to_prune = Vec::new();
    for (id, _) in &affected {
        let Some(node) = pair.tree.get(*id) else { continue };
        let empty_left = node.is_empty_left();
        let empty_right = node.is_empty_right();
        if empty_left && empty_right {
            to_prune.push(*id);
            continue;
        }
        if let Some(direction) = rederive_direction(policy, empty_left, empty_right) {
            if let Some(node) = pair.tree.get_mut(*id) {
                node.set_direction(direction);
            }
        }
    }

    for id in to_prune {
        prune(&mut pair.tree, id);
        pair.roots.retain(|&r| r != id);
    }
}

fn collect_subtree(tree: &PairTree, id: NodeId, side: DeletedSide, out: &mut Vec<(NodeId, DeletedSide)>) {
    let Some(node) = tree.get(id) else { return };
    out.push((id, side));
    for &child in node.children() {
        collect_subtree(tree, child, side, out);
    }
}

fn clear_side(tree: &mut PairTree, id: NodeId, side: DeletedSide) {
    let Some(node) = tree.get_mut(id) else { return };
    match (node, side) {
        (SyncItem::File(f), DeletedSide::Left) => f.left = None,
        (SyncItem::File(f), DeletedSide::Right) => f.right = None,
        (SyncItem::Folder(f), DeletedSide::Left) => f.left = None,
        (SyncItem::Folder(f), DeletedSide::Right) => f.right = None,
        (SyncItem::Symlink(f), DeletedSide::Left) => f.left = None,
        (SyncItem::Symlink(f), DeletedSide::Right) => f.right = None,
    }
}

/// `None` when both sides are now empty (the caller prunes instead of
/// re-deriving a direction for a node that's about to disappear). A node
/// now empty on the left is, for policy purposes, exactly the "right-only"
/// category (present on the right only) and vice versa -- bulk-delete
/// doesn't get its own policy slot, it reuses the category's.
fn rederive_direction(policy: &SyncPolicy, empty_left: bool, empty_right: bool) -> Option<SyncDirection> {
    match (empty_left, empty_right) {
        (true, false) => Some(match policy {
            SyncPolicy::TwoWay { .. } => SyncDirection::Right,
            SyncPolicy::OneWay { policy, .. } => from_policy_direction(policy.ex_right_only),
        }),
        (false, true) => Some(match policy {
            SyncPolicy::TwoWay { .. } => SyncDirection::Left,
            SyncPolicy::OneWay { policy, .. } => from_policy_direction(policy.ex_left_only),
        }),
        _ => None,
    }
}

fn from_policy_direction(d: PolicyDirection) -> SyncDirection {
    match d {
        PolicyDirection::None => SyncDirection::None,
        PolicyDirection::Left => SyncDirection::Left,
        PolicyDirection::Right => SyncDirection::Right,
    }
}

/// Removes `id` and its whole subtree from the arena, detaching it from its
/// parent's child list.
fn prune(tree: &mut PairTree, id: NodeId) {
    let parent = tree.get(id).and_then(|n| n.parent());
    if let Some(node) = tree.get(id) {
        let children: Vec<NodeId> = node.children().to_vec();
        for child in children {
            prune(tree, child);
        }
    }
    tree.remove(id);
    if let Some(parent) = parent {
        tree.detach_child(parent, id);
    }
}

async fn delete_permanently(device: &Arc<dyn OrbitSystem>, item: &DeleteItem) -> Result<()> {
    match item.item_type {
        ItemType::File => device
            .remove_file_plain(&item.rel_path)
            .await
            .map_err(OrbitError::from),
        ItemType::Symlink => device
            .remove_symlink_plain(&item.rel_path)
            .await
            .map_err(OrbitError::from),
        ItemType::Folder => device
            .remove_folder_if_exists_recursively(&item.rel_path, &|_| {}, &|_| {})
            .await
            .map_err(OrbitError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::callback::NoopCallback;
    use crate::system::MockSystem;
    use std::sync::Mutex;

    /// Records every warning/error the engine reports, answering each
    /// `report_error` call with a pre-configured sequence of responses.
    #[derive(Default)]
    struct RecordingCallback {
        warnings: Mutex<Vec<String>>,
        error_responses: Mutex<Vec<ErrorResponse>>,
    }

    impl SyncCallback for RecordingCallback {
        fn report_warning(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn report_error(&self, _message: &str) -> ErrorResponse {
            let mut responses = self.error_responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses.first().copied().unwrap_or(ErrorResponse::Abort)
            }
        }
    }

    #[tokio::test]
    async fn recycle_requested_but_unsupported_warns_once() {
        let mock = MockSystem::new().without_recycle_bin();
        mock.add_file(RelPath::new("a.txt"), b"x", 1);
        mock.add_file(RelPath::new("b.txt"), b"y", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        let items = vec![
            DeleteItem {
                rel_path: RelPath::new("a.txt"),
                item_type: ItemType::File,
            },
            DeleteItem {
                rel_path: RelPath::new("b.txt"),
                item_type: ItemType::File,
            },
        ];
        let cb = RecordingCallback::default();
        let outcome = delete_items(&device, &items, DeleteMode::PreferRecycle, &cb)
            .await
            .unwrap();

        assert_eq!(outcome.deleted.len(), 2);
        assert!(outcome.recycled.is_empty());
        assert_eq!(cb.warnings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ignore_response_records_failure_and_continues() {
        let mock = MockSystem::new();
        mock.add_file(RelPath::new("b.txt"), b"y", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        // "a.txt" doesn't exist, so its permanent delete fails.
        let items = vec![
            DeleteItem {
                rel_path: RelPath::new("a.txt"),
                item_type: ItemType::File,
            },
            DeleteItem {
                rel_path: RelPath::new("b.txt"),
                item_type: ItemType::File,
            },
        ];
        let cb = RecordingCallback {
            error_responses: Mutex::new(vec![ErrorResponse::Ignore]),
            ..Default::default()
        };
        let outcome = delete_items(&device, &items, DeleteMode::Permanent, &cb)
            .await
            .unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, RelPath::new("a.txt"));
        assert_eq!(outcome.deleted, vec![RelPath::new("b.txt")]);
    }

    #[tokio::test]
    async fn abort_response_stops_the_batch() {
        let mock = MockSystem::new();
        mock.add_file(RelPath::new("b.txt"), b"y", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        let items = vec![
            DeleteItem {
                rel_path: RelPath::new("a.txt"),
                item_type: ItemType::File,
            },
            DeleteItem {
                rel_path: RelPath::new("b.txt"),
                item_type: ItemType::File,
            },
        ];
        let cb = RecordingCallback {
            error_responses: Mutex::new(vec![ErrorResponse::Abort]),
            ..Default::default()
        };
        let result = delete_items(&device, &items, DeleteMode::Permanent, &cb).await;

        assert!(result.is_err());
        // The batch stopped before ever reaching "b.txt".
        assert!(device.item_still_exists(&RelPath::new("b.txt")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn prefers_recycle_when_supported() {
        let mock = MockSystem::new();
        mock.add_file(RelPath::new("a.txt"), b"x", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        let items = vec![DeleteItem {
            rel_path: RelPath::new("a.txt"),
            item_type: ItemType::File,
        }];
        let outcome = delete_items(&device, &items, DeleteMode::PreferRecycle, &NoopCallback)
            .await
            .unwrap();
        assert_eq!(outcome.recycled, vec![RelPath::new("a.txt")]);
        assert!(outcome.deleted.is_empty());
    }

    #[tokio::test]
    async fn permanent_mode_bypasses_recycle_bin() {
        let mock = MockSystem::new();
        mock.add_file(RelPath::new("a.txt"), b"x", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        let items = vec![DeleteItem {
            rel_path: RelPath::new("a.txt"),
            item_type: ItemType::File,
        }];
        let outcome = delete_items(&device, &items, DeleteMode::Permanent, &NoopCallback)
            .await
            .unwrap();
        assert_eq!(outcome.deleted, vec![RelPath::new("a.txt")]);
        assert!(outcome.recycled.is_empty());
    }

    #[tokio::test]
    async fn folder_delete_uses_recursive_removal() {
        let mock = MockSystem::new();
        mock.add_folder(RelPath::new("dir"));
        mock.add_file(RelPath::new("dir/a.txt"), b"x", 1);
        let device: Arc<dyn OrbitSystem> = Arc::new(mock);

        let items = vec![DeleteItem {
            rel_path: RelPath::new("dir"),
            item_type: ItemType::Folder,
        }];
        let outcome = delete_items(&device, &items, DeleteMode::Permanent, &NoopCallback)
            .await
            .unwrap();
        assert_eq!(outcome.deleted, vec![RelPath::new("dir")]);
    }

    fn lone_file_pair(tree: &mut PairTree, name: &str, left: bool, right: bool) -> NodeId {
        use crate::sync::category::Category;
        use crate::sync::tree::{FilePair, Side};
        use orbit_core_interface::FileAttrs;

        let attrs = |print: u64| FileAttrs {
            name: name.to_string(),
            size: 1,
            mod_time: 1,
            file_print: print,
            is_followed_symlink: false,
        };
        tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: name.to_string(),
                left: left.then(|| Side {
                    rel_path: RelPath::new(name),
                    attrs: attrs(1),
                }),
                right: right.then(|| Side {
                    rel_path: RelPath::new(name),
                    attrs: attrs(2),
                }),
                category: Some(Category::Equal),
                direction: Some(SyncDirection::None),
                active: true,
                move_ref: None,
            })
        })
    }

    fn empty_pair() -> BaseFolderPair {
        let left: Arc<dyn OrbitSystem> = Arc::new(MockSystem::with_id("l"));
        let right: Arc<dyn OrbitSystem> = Arc::new(MockSystem::with_id("r"));
        BaseFolderPair::new(left, right, RelPath::root(), RelPath::root())
    }

    #[test]
    fn reconcile_prunes_node_deleted_on_both_sides() {
        let mut pair = empty_pair();
        let id = lone_file_pair(&mut pair.tree, "a.txt", true, true);
        pair.roots.push(id);

        reconcile_tree_after_delete(
            &mut pair,
            &SyncPolicy::TwoWay { detect_moves: false },
            &[
                TreeDeletion { id, side: DeletedSide::Left },
                TreeDeletion { id, side: DeletedSide::Right },
            ],
        );

        assert!(pair.tree.get(id).is_none());
        assert!(!pair.roots.contains(&id));
    }

    #[test]
    fn reconcile_rederives_direction_for_one_side_deleted_two_way() {
        let mut pair = empty_pair();
        let id = lone_file_pair(&mut pair.tree, "a.txt", true, true);
        pair.roots.push(id);

        reconcile_tree_after_delete(
            &mut pair,
            &SyncPolicy::TwoWay { detect_moves: false },
            &[TreeDeletion { id, side: DeletedSide::Left }],
        );

        let node = pair.tree.get(id).unwrap();
        assert!(node.is_empty_left());
        assert!(!node.is_empty_right());
        assert_eq!(node.direction(), Some(SyncDirection::Right));
    }

    #[test]
    fn reconcile_rederives_direction_from_one_way_policy() {
        use crate::sync::policy::OneWayPolicy;

        let mut pair = empty_pair();
        let id = lone_file_pair(&mut pair.tree, "a.txt", true, true);
        pair.roots.push(id);

        reconcile_tree_after_delete(
            &mut pair,
            &SyncPolicy::OneWay {
                policy: OneWayPolicy::mirror(),
                detect_moves: false,
            },
            &[TreeDeletion { id, side: DeletedSide::Right }],
        );

        let node = pair.tree.get(id).unwrap();
        // Right side is now gone, so this is a left-only item for policy
        // purposes; mirror's ex_left_only is Right, so it's flagged to be
        // deleted off the left too.
        assert_eq!(node.direction(), Some(SyncDirection::Right));
    }
}
