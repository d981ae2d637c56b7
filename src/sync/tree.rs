//! The in-memory pair tree: `BaseFolderPair -> FolderPair -> {FilePair,
//! SymlinkPair, FolderPair...}`, each node carrying both sides' attributes
//! (or side-empty markers), a computed category, and a resolved direction.
//!
//! Nodes live in a flat arena (`PairTree`) addressed by [`NodeId`] rather
//! than nested owned children, so the move detector and bulk-delete pruning
//! can hold a stable id on one node while mutating another without fighting
//! the borrow checker over parent/child aliasing.

use super::category::Category;
use super::direction::SyncDirection;
use orbit_core_interface::{FileAttrs, FolderAttrs, RelPath, SymlinkAttrs};
use std::sync::Arc;

/// Stable identifier for a node in a [`PairTree`]. Cheap to copy, never
/// reused after removal, so a dangling move-reference is distinguishable
/// from a fresh allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// One side's recorded presence for an item: the path it was found at (the
/// two sides can differ in case/normalization) plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side<A> {
    pub rel_path: RelPath,
    pub attrs: A,
}

#[derive(Debug, Clone)]
pub struct FilePair {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub left: Option<Side<FileAttrs>>,
    pub right: Option<Side<FileAttrs>>,
    pub category: Option<Category>,
    pub direction: Option<SyncDirection>,
    pub active: bool,
    /// Weak reference to this item's move partner, if the move detector
    /// paired it with a one-side-only item on the other side.
    pub move_ref: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SymlinkPair {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub left: Option<Side<SymlinkAttrs>>,
    pub right: Option<Side<SymlinkAttrs>>,
    pub category: Option<Category>,
    pub direction: Option<SyncDirection>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct FolderPair {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub left: Option<Side<FolderAttrs>>,
    pub right: Option<Side<FolderAttrs>>,
    pub category: Option<Category>,
    pub direction: Option<SyncDirection>,
    pub active: bool,
    pub children: Vec<NodeId>,
}

/// A node in the pair tree, dispatched by item kind.
#[derive(Debug, Clone)]
pub enum SyncItem {
    File(FilePair),
    Folder(FolderPair),
    Symlink(SymlinkPair),
}

impl SyncItem {
    pub fn id(&self) -> NodeId {
        match self {
            SyncItem::File(f) => f.id,
            SyncItem::Folder(f) => f.id,
            SyncItem::Symlink(f) => f.id,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            SyncItem::File(f) => f.parent,
            SyncItem::Folder(f) => f.parent,
            SyncItem::Symlink(f) => f.parent,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SyncItem::File(f) => &f.name,
            SyncItem::Folder(f) => &f.name,
            SyncItem::Symlink(f) => &f.name,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            SyncItem::File(f) => f.category.clone(),
            SyncItem::Folder(f) => f.category.clone(),
            SyncItem::Symlink(f) => f.category.clone(),
        }
    }

    pub fn set_category(&mut self, category: Category) {
        match self {
            SyncItem::File(f) => f.category = Some(category),
            SyncItem::Folder(f) => f.category = Some(category),
            SyncItem::Symlink(f) => f.category = Some(category),
        }
    }

    pub fn direction(&self) -> Option<SyncDirection> {
        match self {
            SyncItem::File(f) => f.direction.clone(),
            SyncItem::Folder(f) => f.direction.clone(),
            SyncItem::Symlink(f) => f.direction.clone(),
        }
    }

    pub fn set_direction(&mut self, direction: SyncDirection) {
        match self {
            SyncItem::File(f) => f.direction = Some(direction),
            SyncItem::Folder(f) => f.direction = Some(direction),
            SyncItem::Symlink(f) => f.direction = Some(direction),
        }
    }

    pub fn active(&self) -> bool {
        match self {
            SyncItem::File(f) => f.active,
            SyncItem::Folder(f) => f.active,
            SyncItem::Symlink(f) => f.active,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        match self {
            SyncItem::File(f) => f.active = active,
            SyncItem::Folder(f) => f.active = active,
            SyncItem::Symlink(f) => f.active = active,
        }
    }

    pub fn is_empty_left(&self) -> bool {
        match self {
            SyncItem::File(f) => f.left.is_none(),
            SyncItem::Folder(f) => f.left.is_none(),
            SyncItem::Symlink(f) => f.left.is_none(),
        }
    }

    pub fn is_empty_right(&self) -> bool {
        match self {
            SyncItem::File(f) => f.right.is_none(),
            SyncItem::Folder(f) => f.right.is_none(),
            SyncItem::Symlink(f) => f.right.is_none(),
        }
    }

    /// Relative path on whichever side is present, preferring left.
    pub fn rel_path(&self) -> Option<&RelPath> {
        match self {
            SyncItem::File(f) => f.left.as_ref().map(|s| &s.rel_path).or(f.right.as_ref().map(|s| &s.rel_path)),
            SyncItem::Folder(f) => f.left.as_ref().map(|s| &s.rel_path).or(f.right.as_ref().map(|s| &s.rel_path)),
            SyncItem::Symlink(f) => f.left.as_ref().map(|s| &s.rel_path).or(f.right.as_ref().map(|s| &s.rel_path)),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            SyncItem::Folder(f) => &f.children,
            _ => &[],
        }
    }
}

/// Flat arena of [`SyncItem`]s. Nodes are never reused after `remove`, so a
/// stale [`NodeId`] reliably resolves to `None` instead of a different item.
#[derive(Debug, Default)]
pub struct PairTree {
    slots: Vec<Option<SyncItem>>,
}

impl PairTree {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn alloc(&mut self, build: impl FnOnce(NodeId) -> SyncItem) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(build(id)));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SyncItem> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SyncItem> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    /// Removes a node from the arena without touching its parent's child
    /// list; callers that prune subtrees are responsible for also removing
    /// the id from the parent folder's `children`.
    pub fn remove(&mut self, id: NodeId) -> Option<SyncItem> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.take())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncItem> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SyncItem> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `child` from `parent`'s children list, if `parent` is a folder.
    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(SyncItem::Folder(f)) = self.get_mut(parent) {
            f.children.retain(|&c| c != child);
        }
    }
}

/// A configured (left root, right root) pair and the forest of item pairs
/// scanned under it.
pub struct BaseFolderPair {
    pub left_device: Arc<dyn orbit_core_interface::OrbitSystem>,
    pub right_device: Arc<dyn orbit_core_interface::OrbitSystem>,
    pub left_root: RelPath,
    pub right_root: RelPath,
    pub tree: PairTree,
    /// Top-level item ids directly under the two roots.
    pub roots: Vec<NodeId>,
}

impl BaseFolderPair {
    pub fn new(
        left_device: Arc<dyn orbit_core_interface::OrbitSystem>,
        right_device: Arc<dyn orbit_core_interface::OrbitSystem>,
        left_root: RelPath,
        right_root: RelPath,
    ) -> Self {
        Self {
            left_device,
            right_device,
            left_root,
            right_root,
            tree: PairTree::new(),
            roots: Vec::new(),
        }
    }

    pub fn devices_equivalent(&self) -> bool {
        self.left_device.is_equivalent(self.right_device.as_ref())
    }

    /// Walks every node in name-sorted order per sibling list (case-sensitive),
    /// the ordering guarantee the resolver and bulk operations rely on for
    /// deterministic logs.
    pub fn walk_sorted(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut roots = self.roots.clone();
        roots.sort_by_key(|id| self.tree.get(*id).map(|n| n.name().to_string()).unwrap_or_default());
        for id in roots {
            self.walk_from(id, &mut out);
        }
        out
    }

    fn walk_from(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(node) = self.tree.get(id) {
            let mut children = node.children().to_vec();
            children.sort_by_key(|c| self.tree.get(*c).map(|n| n.name().to_string()).unwrap_or_default());
            for child in children {
                self.walk_from(child, out);
            }
        }
    }
}
