//! Bidirectional file synchronization decision engine.
//!
//! Pipeline: scan two trees into a [`tree::PairTree`] -> assign each pair a
//! [`category::Category`] -> resolve a [`direction::SyncDirection`] against
//! the configured [`policy::SyncPolicy`] and any [`insync::LastSyncState`]
//! -> pair up one-side-only files via [`movedetect`] -> apply
//! [`filter`] scoping -> hand the resulting action list to [`bulk`] for
//! execution. [`callback`] carries progress and cancellation through every
//! stage.

pub mod bulk;
pub mod callback;
pub mod category;
pub mod direction;
pub mod filter;
pub mod insync;
pub mod movedetect;
pub mod pathdep;
pub mod policy;
pub mod scan;
pub mod tree;

pub use bulk::{
    copy_to, copy_to_with_overwrite, delete_items, reconcile_tree_after_delete, CopyToItem, CopyToOutcome,
    DeletedSide, DeleteItem, DeleteMode, DeleteOutcome, TreeDeletion,
};
pub use callback::{CancelToken, ErrorResponse, NoopCallback, Phase, SyncCallback};
pub use category::Category;
pub use direction::SyncDirection;
pub use filter::{AndFilter, FilterStrategy, HardFilter, SoftFilter, TimeSpan};
pub use insync::{
    record_still_in_sync, DbVerdict, DescrFile, DescrLink, FolderRecordStatus, InSyncFile, InSyncFolder,
    InSyncSymlink, LastSyncState,
};
pub use pathdep::{check_no_nested_roots, PathDependencyError, RootRef};
pub use policy::{ComparisonVariant, OneWayPolicy, PolicyDirection, SyncPolicy, TimeTolerance};
pub use scan::scan;
pub use tree::{BaseFolderPair, FilePair, FolderPair, NodeId, PairTree, Side, SymlinkPair, SyncItem};

use crate::error::{OrbitError, Result};
use std::sync::Arc;

/// Orchestrates one base folder pair's scan-to-decision pipeline. Does not
/// itself walk the filesystem (that's the traversal layer in
/// `orbit-core-interface`) -- it consumes an already-populated
/// [`BaseFolderPair`] and assigns categories/directions/move pairings over
/// it, then optionally drives execution through [`bulk`].
pub struct SyncEngine {
    pub policy: SyncPolicy,
    pub comparison: ComparisonVariant,
    pub tolerance: TimeTolerance,
    pub hard_filter: AndFilter,
    pub soft_filter: Option<SoftFilter>,
    pub soft_strategy: FilterStrategy,
}

impl SyncEngine {
    pub fn new(policy: SyncPolicy, comparison: ComparisonVariant) -> Self {
        Self {
            policy,
            comparison,
            tolerance: TimeTolerance::default(),
            hard_filter: AndFilter {
                left: HardFilter::new(),
                right: HardFilter::new(),
            },
            soft_filter: None,
            soft_strategy: FilterStrategy::And,
        }
    }

    pub fn with_tolerance(mut self, tolerance: TimeTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_hard_filter(mut self, filter: AndFilter) -> Self {
        self.hard_filter = filter;
        self
    }

    /// Layers a soft (time/size) scope on top of the hard filter. `strategy`
    /// controls whether this overwrites `active` outright (`Set`) or only
    /// narrows it (`And`, the default -- never revives something the hard
    /// filter already excluded).
    pub fn with_soft_filter(mut self, filter: SoftFilter, strategy: FilterStrategy) -> Self {
        self.soft_filter = Some(filter);
        self.soft_strategy = strategy;
        self
    }

    /// Assigns a category and a resolved direction to every node in `pair`,
    /// then runs move detection if the policy asks for it. Nodes excluded
    /// by the hard filter are left inactive (category/direction `None`)
    /// rather than removed, so the caller can still render them as
    /// "excluded" in a UI.
    pub fn resolve(
        &self,
        pair: &mut BaseFolderPair,
        db: &LastSyncState,
        cancel: &CancelToken,
        callback: &dyn SyncCallback,
    ) -> Result<()> {
        // `pair.tree.iter()` yields nodes in allocation order, and a folder
        // is always allocated before its children (see `scan::scan_folder`),
        // so a single top-down pass is enough to implement the folder
        // pruning rule: once an ancestor is pruned, every descendant id is
        // already known before we reach it.
        let ids: Vec<NodeId> = pair.tree.iter().map(|n| n.id()).collect();
        let mut pruned: std::collections::HashSet<NodeId> = std::collections::HashSet::new();

        if matches!(self.policy, SyncPolicy::TwoWay { .. }) && db.is_empty() {
            let msg = "Setting directions for first synchronization...";
            tracing::info!("{msg}");
            callback.log_info(msg);
        }

        tracing::info!(items = ids.len(), "resolve: comparing start");
        callback.init_new_phase(Phase::Comparing, Some(ids.len() as u64));

        for id in &ids {
            cancel.check()?;
            let Some(path) = pair.tree.get(*id).and_then(|n| n.rel_path().cloned()) else {
                continue;
            };

            if pruned.contains(id) {
                if let Some(node) = pair.tree.get_mut(*id) {
                    node.set_active(false);
                    pruned.extend(node.children().iter().copied());
                }
                continue;
            }

            if !self.hard_filter.matches(&path) {
                let is_folder = matches!(pair.tree.get(*id), Some(SyncItem::Folder(_)));
                if let Some(node) = pair.tree.get_mut(*id) {
                    node.set_active(false);
                }
                if is_folder && !self.hard_filter.child_might_match(&path) {
                    if let Some(node) = pair.tree.get(*id) {
                        pruned.extend(node.children().iter().copied());
                    }
                }
                continue;
            }

            let category = self.categorize(pair, *id)?;
            let direction = {
                let node = pair
                    .tree
                    .get(*id)
                    .ok_or_else(|| OrbitError::Other("dangling node id during resolve".to_string()))?;
                let verdict = self.db_verdict(node, path.as_str(), db);
                direction::resolve_direction(node.name(), &category, &self.policy, verdict.as_ref())
            };

            let mut active = true;
            let mut final_direction = direction;
            if let Some(soft) = &self.soft_filter {
                let soft_matches = self.soft_matches(pair, *id, soft);
                active = self.soft_strategy.apply(active, soft_matches);
                if !active {
                    final_direction = SyncDirection::None;
                }
            }

            if let Some(node) = pair.tree.get_mut(*id) {
                node.set_category(category);
                node.set_direction(final_direction);
                node.set_active(active);
            }
        }

        if self.policy.detect_moves() {
            movedetect::detect_moves(&mut pair.tree, &ids, db, self.comparison, &self.tolerance);
        }

        tracing::info!("resolve: comparing done");
        Ok(())
    }

    /// Evaluates the soft filter against whichever attribute type this
    /// node holds (spec.md 4.5's time-span convenience is per item kind:
    /// folders are an unconditional flag, files/symlinks compare attrs).
    fn soft_matches(&self, pair: &BaseFolderPair, id: NodeId, soft: &SoftFilter) -> bool {
        match pair.tree.get(id) {
            Some(SyncItem::File(f)) => soft.matches_file(
                f.left.as_ref().map(|s| &s.attrs),
                f.right.as_ref().map(|s| &s.attrs),
            ),
            Some(SyncItem::Symlink(s)) => soft.matches_symlink(
                s.left.as_ref().map(|side| &side.attrs),
                s.right.as_ref().map(|side| &side.attrs),
            ),
            Some(SyncItem::Folder(_)) => soft.matches_folder(),
            None => false,
        }
    }

    /// Looks up the last-sync record for this path and evaluates the
    /// current attributes against it, dispatching on item kind since each
    /// kind has its own matcher (spec.md 4.3). Returns `None` when the
    /// database has nothing recorded for this path at all.
    fn db_verdict(&self, node: &SyncItem, path: &str, db: &LastSyncState) -> Option<insync::DbVerdict> {
        match node {
            SyncItem::File(f) => db.evaluate_file(
                path,
                f.left.as_ref().map(|s| (s.attrs.size, s.attrs.mod_time)),
                f.right.as_ref().map(|s| (s.attrs.size, s.attrs.mod_time)),
                self.comparison,
                &self.tolerance,
            ),
            SyncItem::Symlink(s) => db.evaluate_symlink(
                path,
                s.left.as_ref().map(|side| side.attrs.mod_time),
                s.right.as_ref().map(|side| side.attrs.mod_time),
                self.comparison,
                &self.tolerance,
            ),
            SyncItem::Folder(d) => db.evaluate_folder(path, d.left.is_some(), d.right.is_some()),
        }
    }

    fn categorize(&self, pair: &BaseFolderPair, id: NodeId) -> Result<Category> {
        let node = pair
            .tree
            .get(id)
            .ok_or_else(|| OrbitError::Other("dangling node id during categorize".to_string()))?;
        let category = match node {
            SyncItem::File(f) => category::categorize_file(
                f.left.as_ref().map(|s| &s.attrs),
                f.right.as_ref().map(|s| &s.attrs),
                self.comparison,
                &self.tolerance,
                None,
            ),
            SyncItem::Symlink(s) => category::categorize_symlink(
                s.left.as_ref().map(|s| &s.attrs),
                s.right.as_ref().map(|s| &s.attrs),
                self.comparison,
                &self.tolerance,
                None,
            ),
            SyncItem::Folder(d) => {
                category::categorize_folder(d.left.as_ref().map(|s| &s.attrs), d.right.as_ref().map(|s| &s.attrs))
            }
        };
        Ok(category)
    }
}

/// Convenience used by [`SyncEngine`] callers that already hold devices
/// and want the path-dependency check run before scanning starts.
pub fn validate_roots(pairs: &[(&Arc<dyn orbit_core_interface::OrbitSystem>, &orbit_core_interface::RelPath)]) -> Result<()> {
    let roots: Vec<RootRef<'_>> = pairs
        .iter()
        .map(|(device, root)| RootRef::new(device, root))
        .collect();
    check_no_nested_roots(&roots).map_err(|e| OrbitError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;
    use orbit_core_interface::{FileAttrs, RelPath};

    fn attrs(size: u64, mod_time: i64, print: u64) -> FileAttrs {
        FileAttrs {
            name: "f".to_string(),
            size,
            mod_time,
            file_print: print,
            is_followed_symlink: false,
        }
    }

    #[test]
    fn resolve_marks_equal_file_with_none_direction() {
        let left: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("l"));
        let right: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("r"));
        let mut pair = BaseFolderPair::new(left, right, RelPath::root(), RelPath::root());
        let id = pair.tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: "a.txt".to_string(),
                left: Some(Side {
                    rel_path: RelPath::new("a.txt"),
                    attrs: attrs(10, 100, 1),
                }),
                right: Some(Side {
                    rel_path: RelPath::new("a.txt"),
                    attrs: attrs(10, 100, 2),
                }),
                category: None,
                direction: None,
                active: true,
                move_ref: None,
            })
        });
        pair.roots.push(id);

        let engine = SyncEngine::new(SyncPolicy::TwoWay { detect_moves: false }, ComparisonVariant::TimeSize);
        let db = LastSyncState::new();
        let cancel = CancelToken::new();
        engine.resolve(&mut pair, &db, &cancel, &NoopCallback).unwrap();

        let node = pair.tree.get(id).unwrap();
        assert_eq!(node.category(), Some(Category::Equal));
        assert_eq!(node.direction(), Some(SyncDirection::None));
    }

    #[test]
    fn resolve_respects_cancellation() {
        let left: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("l"));
        let right: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("r"));
        let mut pair = BaseFolderPair::new(left, right, RelPath::root(), RelPath::root());
        let id = pair.tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: "a.txt".to_string(),
                left: Some(Side {
                    rel_path: RelPath::new("a.txt"),
                    attrs: attrs(10, 100, 1),
                }),
                right: None,
                category: None,
                direction: None,
                active: true,
                move_ref: None,
            })
        });
        pair.roots.push(id);

        let engine = SyncEngine::new(SyncPolicy::TwoWay { detect_moves: false }, ComparisonVariant::TimeSize);
        let db = LastSyncState::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(engine.resolve(&mut pair, &db, &cancel, &NoopCallback).is_err());
    }

    #[test]
    fn soft_filter_deactivates_out_of_range_file_but_keeps_category() {
        let left: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("l"));
        let right: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("r"));
        let mut pair = BaseFolderPair::new(left, right, RelPath::root(), RelPath::root());
        let id = pair.tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: "a.txt".to_string(),
                left: Some(Side {
                    rel_path: RelPath::new("a.txt"),
                    attrs: attrs(10, 100, 1),
                }),
                right: None,
                category: None,
                direction: None,
                active: true,
                move_ref: None,
            })
        });
        pair.roots.push(id);

        let engine = SyncEngine::new(SyncPolicy::TwoWay { detect_moves: false }, ComparisonVariant::TimeSize)
            .with_soft_filter(
                filter::SoftFilter {
                    time_span: Some(filter::TimeSpan { from: 0, to: 50 }),
                    ..Default::default()
                },
                filter::FilterStrategy::And,
            );
        let db = LastSyncState::new();
        let cancel = CancelToken::new();
        engine.resolve(&mut pair, &db, &cancel, &NoopCallback).unwrap();

        let node = pair.tree.get(id).unwrap();
        assert_eq!(node.category(), Some(Category::LeftOnly));
        assert_eq!(node.direction(), Some(SyncDirection::None));
        assert!(!node.active());
    }

    #[test]
    fn hard_filter_prunes_whole_excluded_subtree() {
        let left: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("l"));
        let right: Arc<dyn orbit_core_interface::OrbitSystem> = Arc::new(MockSystem::with_id("r"));
        let mut pair = BaseFolderPair::new(left, right, RelPath::root(), RelPath::root());

        let folder_id = pair.tree.alloc(|id| {
            SyncItem::Folder(FolderPair {
                id,
                parent: None,
                name: "build".to_string(),
                left: Some(Side {
                    rel_path: RelPath::new("build"),
                    attrs: orbit_core_interface::FolderAttrs {
                        name: "build".to_string(),
                        is_followed_symlink: false,
                    },
                }),
                right: None,
                category: None,
                direction: None,
                active: true,
                children: Vec::new(),
            })
        });
        let child_id = pair.tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: Some(folder_id),
                name: "out.o".to_string(),
                left: Some(Side {
                    rel_path: RelPath::new("build/out.o"),
                    attrs: attrs(10, 100, 1),
                }),
                right: None,
                category: None,
                direction: None,
                active: true,
                move_ref: None,
            })
        });
        if let Some(SyncItem::Folder(f)) = pair.tree.get_mut(folder_id) {
            f.children = vec![child_id];
        }
        pair.roots.push(folder_id);

        // Need both rules: "build" so the folder row itself is rejected,
        // "build/**" so `child_might_match` can prove no descendant could
        // ever match either -- only then does the pruning rule apply.
        let hard_filter = AndFilter {
            left: HardFilter::new().exclude("build").unwrap().exclude("build/**").unwrap(),
            right: HardFilter::new(),
        };
        let engine = SyncEngine::new(SyncPolicy::TwoWay { detect_moves: false }, ComparisonVariant::TimeSize)
            .with_hard_filter(hard_filter);
        let db = LastSyncState::new();
        let cancel = CancelToken::new();
        engine.resolve(&mut pair, &db, &cancel, &NoopCallback).unwrap();

        let folder_node = pair.tree.get(folder_id).unwrap();
        assert!(!folder_node.active());
        assert!(folder_node.category().is_none());

        // Pruned without individual evaluation: no category/direction assigned.
        let child_node = pair.tree.get(child_id).unwrap();
        assert!(!child_node.active());
        assert!(child_node.category().is_none());
    }
}
