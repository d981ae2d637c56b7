//! Builds a [`tree::PairTree`] by recursively listing both sides of a
//! [`tree::BaseFolderPair`] and merging same-name siblings into shared
//! nodes. Kept deliberately simple (depth-first, one `read_dir` at a time)
//! rather than using `OrbitSystem::traverse_folder_recursive`'s
//! callback-based fan-out, since the merge step needs both sides' listings
//! together before it can allocate a node.

use super::tree::{BaseFolderPair, FilePair, FolderPair, NodeId, Side, SyncItem, SymlinkPair};
use crate::error::{OrbitError, Result};
use orbit_core_interface::{DirEntry, ItemType, OrbitSystem, RelPath};
use std::collections::BTreeMap;

/// Scans both roots of `pair` and populates its tree from scratch,
/// replacing any existing contents.
pub async fn scan(pair: &mut BaseFolderPair) -> Result<()> {
    pair.tree = super::tree::PairTree::new();
    pair.roots.clear();
    let left_root = pair.left_root.clone();
    let right_root = pair.right_root.clone();
    let roots = scan_folder(pair, None, &left_root, &right_root).await?;
    pair.roots = roots;
    Ok(())
}

async fn list(device: &dyn OrbitSystem, path: &RelPath) -> Result<BTreeMap<String, DirEntry>> {
    match device.item_still_exists(path).await.map_err(OrbitError::from)? {
        Some(ItemType::Folder) => Ok(device
            .read_dir(path)
            .await
            .map_err(OrbitError::from)?
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect()),
        _ => Ok(BTreeMap::new()),
    }
}

async fn scan_folder(
    pair: &mut BaseFolderPair,
    parent: Option<NodeId>,
    left_path: &RelPath,
    right_path: &RelPath,
) -> Result<Vec<NodeId>> {
    let left_entries = list(pair.left_device.as_ref(), left_path).await?;
    let right_entries = list(pair.right_device.as_ref(), right_path).await?;

    let mut names: Vec<&String> = left_entries.keys().chain(right_entries.keys()).collect();
    names.sort();
    names.dedup();

    let mut out = Vec::new();
    for name in names {
        let left_entry = left_entries.get(name);
        let right_entry = right_entries.get(name);
        let item_type = left_entry.or(right_entry).map(|e| e.item_type).unwrap();

        let left_child = left_path.join_name(name);
        let right_child = right_path.join_name(name);

        let id = match item_type {
            ItemType::File => {
                let left = match left_entry {
                    Some(_) => Some(Side {
                        rel_path: left_child.clone(),
                        attrs: pair
                            .left_device
                            .file_attrs(&left_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                let right = match right_entry {
                    Some(_) => Some(Side {
                        rel_path: right_child.clone(),
                        attrs: pair
                            .right_device
                            .file_attrs(&right_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                pair.tree.alloc(|id| {
                    SyncItem::File(FilePair {
                        id,
                        parent,
                        name: name.clone(),
                        left,
                        right,
                        category: None,
                        direction: None,
                        active: true,
                        move_ref: None,
                    })
                })
            }
            ItemType::Symlink => {
                let left = match left_entry {
                    Some(_) => Some(Side {
                        rel_path: left_child.clone(),
                        attrs: pair
                            .left_device
                            .symlink_attrs(&left_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                let right = match right_entry {
                    Some(_) => Some(Side {
                        rel_path: right_child.clone(),
                        attrs: pair
                            .right_device
                            .symlink_attrs(&right_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                pair.tree.alloc(|id| {
                    SyncItem::Symlink(SymlinkPair {
                        id,
                        parent,
                        name: name.clone(),
                        left,
                        right,
                        category: None,
                        direction: None,
                        active: true,
                    })
                })
            }
            ItemType::Folder => {
                let left = match left_entry {
                    Some(_) => Some(Side {
                        rel_path: left_child.clone(),
                        attrs: pair
                            .left_device
                            .folder_attrs(&left_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                let right = match right_entry {
                    Some(_) => Some(Side {
                        rel_path: right_child.clone(),
                        attrs: pair
                            .right_device
                            .folder_attrs(&right_child)
                            .await
                            .map_err(OrbitError::from)?,
                    }),
                    None => None,
                };
                let id = pair.tree.alloc(|id| {
                    SyncItem::Folder(FolderPair {
                        id,
                        parent,
                        name: name.clone(),
                        left,
                        right,
                        category: None,
                        direction: None,
                        active: true,
                        children: Vec::new(),
                    })
                });
                let children =
                    Box::pin(scan_folder(pair, Some(id), &left_child, &right_child)).await?;
                if let Some(SyncItem::Folder(f)) = pair.tree.get_mut(id) {
                    f.children = children;
                }
                id
            }
        };
        out.push(id);
    }
    Ok(out)
}
