//! Move Detector: pairs up one-side-only files that are really the same
//! file moved or renamed (spec.md 4.4).
//!
//! The database is walked first (not the tree): for every file the last
//! sync recorded, each side is probed for a still-present one-side-only
//! candidate, path first (exact match against the DB's own recorded
//! size/mod-time, no FAT tolerance -- the DB is either metadata-from-scan
//! or estimated-at-copy-time, both fine at second precision) and file print
//! second. A print that appears more than once among one-side-only
//! candidates on either side is purged entirely rather than guessed at,
//! since there is no way to tell which pairing is correct.

use super::category::Category;
use super::insync::{record_still_in_sync, LastSyncState};
use super::policy::{ComparisonVariant, TimeTolerance};
use super::tree::{NodeId, PairTree, SyncItem};
use std::collections::{HashMap, HashSet};

/// Runs move detection over every currently-active, one-side-only file in
/// `tree` restricted to `node_ids`, linking confirmed pairs via
/// `FilePair::move_ref`.
pub fn detect_moves(
    tree: &mut PairTree,
    node_ids: &[NodeId],
    db: &LastSyncState,
    variant: ComparisonVariant,
    tolerance: &TimeTolerance,
) {
    let mut left_by_print: HashMap<u64, Vec<NodeId>> = HashMap::new();
    let mut right_by_print: HashMap<u64, Vec<NodeId>> = HashMap::new();
    let mut left_by_path: HashMap<String, NodeId> = HashMap::new();
    let mut right_by_path: HashMap<String, NodeId> = HashMap::new();

    for &id in node_ids {
        let Some(SyncItem::File(f)) = tree.get(id) else {
            continue;
        };
        match f.category {
            Some(Category::LeftOnly) => {
                if let Some(side) = &f.left {
                    left_by_path.insert(side.rel_path.as_str().to_string(), id);
                    if side.attrs.file_print != 0 {
                        left_by_print.entry(side.attrs.file_print).or_default().push(id);
                    }
                }
            }
            Some(Category::RightOnly) => {
                if let Some(side) = &f.right {
                    right_by_path.insert(side.rel_path.as_str().to_string(), id);
                    if side.attrs.file_print != 0 {
                        right_by_print.entry(side.attrs.file_print).or_default().push(id);
                    }
                }
            }
            _ => {}
        }
    }

    purge_duplicates(&mut left_by_print);
    purge_duplicates(&mut right_by_print);

    let mut paired: HashSet<NodeId> = HashSet::new();
    let mut pairs: Vec<(NodeId, NodeId)> = Vec::new();

    if db.is_empty() {
        // First run: nothing to cross-check a DB entry against, but we can
        // still trust a unique, duplicate-free print shared by exactly one
        // left-only and one right-only candidate, since otherwise the very
        // first sync would needlessly pair every move as a delete+copy.
        for (print, left_ids) in &left_by_print {
            let Some(right_ids) = right_by_print.get(print) else {
                continue;
            };
            if left_ids.len() == 1 && right_ids.len() == 1 {
                pairs.push((left_ids[0], right_ids[0]));
            }
        }
    } else {
        for (path, rec) in db.file_entries() {
            if !record_still_in_sync(variant, rec.compare_variant_used, tolerance, rec.left.mod_time, rec.right.mod_time) {
                continue;
            }
            let left_id = probe(tree, &left_by_path, &left_by_print, path, rec.left.mod_time, rec.left.file_print, rec.size, true);
            let right_id = probe(tree, &right_by_path, &right_by_print, path, rec.right.mod_time, rec.right.file_print, rec.size, false);
            if let (Some(l), Some(r)) = (left_id, right_id) {
                if paired.contains(&l) || paired.contains(&r) {
                    continue;
                }
                paired.insert(l);
                paired.insert(r);
                pairs.push((l, r));
            }
        }
    }

    for (left_id, right_id) in pairs {
        if let Some(SyncItem::File(f)) = tree.get_mut(left_id) {
            f.move_ref = Some(right_id);
        }
        if let Some(SyncItem::File(f)) = tree.get_mut(right_id) {
            f.move_ref = Some(left_id);
        }
    }
}

fn purge_duplicates(candidates: &mut HashMap<u64, Vec<NodeId>>) {
    candidates.retain(|_, ids| ids.len() == 1);
}

/// Looks up a candidate node for one side of a DB file entry: path-indexed
/// first (exact strict match against the DB's recorded size/mod-time),
/// falling back to the print index.
fn probe(
    tree: &PairTree,
    by_path: &HashMap<String, NodeId>,
    by_print: &HashMap<u64, Vec<NodeId>>,
    db_path: &str,
    db_mod_time: i64,
    db_print: u64,
    db_size: u64,
    is_left: bool,
) -> Option<NodeId> {
    if let Some(&id) = by_path.get(db_path) {
        if strict_match(tree, id, is_left, db_mod_time, db_size) {
            return Some(id);
        }
    }
    if db_print != 0 {
        if let Some(ids) = by_print.get(&db_print) {
            if ids.len() == 1 {
                return Some(ids[0]);
            }
        }
    }
    None
}

fn strict_match(tree: &PairTree, id: NodeId, is_left: bool, db_mod_time: i64, db_size: u64) -> bool {
    let Some(SyncItem::File(f)) = tree.get(id) else {
        return false;
    };
    let attrs = if is_left { f.left.as_ref() } else { f.right.as_ref() }.map(|s| &s.attrs);
    match attrs {
        Some(a) => a.size == db_size && a.mod_time == db_mod_time,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::insync::DescrFile;
    use crate::sync::tree::{FilePair, Side};
    use orbit_core_interface::{FileAttrs, RelPath};

    fn file_attrs_at(name: &str, size: u64, mod_time: i64, print: u64) -> FileAttrs {
        FileAttrs {
            name: name.to_string(),
            size,
            mod_time,
            file_print: print,
            is_followed_symlink: false,
        }
    }

    fn push_left_only(tree: &mut PairTree, path: &str, size: u64, mod_time: i64, print: u64) -> NodeId {
        tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: path.rsplit('/').next().unwrap().to_string(),
                left: Some(Side {
                    rel_path: RelPath::new(path),
                    attrs: file_attrs_at(path, size, mod_time, print),
                }),
                right: None,
                category: Some(Category::LeftOnly),
                direction: None,
                active: true,
                move_ref: None,
            })
        })
    }

    fn push_right_only(tree: &mut PairTree, path: &str, size: u64, mod_time: i64, print: u64) -> NodeId {
        tree.alloc(|id| {
            SyncItem::File(FilePair {
                id,
                parent: None,
                name: path.rsplit('/').next().unwrap().to_string(),
                left: None,
                right: Some(Side {
                    rel_path: RelPath::new(path),
                    attrs: file_attrs_at(path, size, mod_time, print),
                }),
                category: Some(Category::RightOnly),
                direction: None,
                active: true,
                move_ref: None,
            })
        })
    }

    #[test]
    fn first_run_links_unique_print_with_no_db() {
        let mut tree = PairTree::new();
        let l = push_left_only(&mut tree, "moved/c.txt", 5, 50, 42);
        let r = push_right_only(&mut tree, "sub/c.txt", 5, 50, 42);
        let ids = vec![l, r];
        let db = LastSyncState::new();
        detect_moves(&mut tree, &ids, &db, ComparisonVariant::TimeSize, &TimeTolerance::default());
        match tree.get(l).unwrap() {
            SyncItem::File(f) => assert_eq!(f.move_ref, Some(r)),
            _ => panic!(),
        }
    }

    #[test]
    fn genuine_move_found_via_path_index() {
        // spec.md 8 scenario 3: DB has c.txt in sync at sub/c.txt with print 42;
        // left now has it at moved/c.txt (print 42), right still has it at
        // sub/c.txt (print 42, so path-index finds it directly).
        let mut tree = PairTree::new();
        let l = push_left_only(&mut tree, "moved/c.txt", 5, 50, 42);
        let r = push_right_only(&mut tree, "sub/c.txt", 5, 50, 42);
        let ids = vec![l, r];
        let mut db = LastSyncState::new();
        db.record_file("sub/c.txt", DescrFile { mod_time: 50, file_print: 42 }, DescrFile { mod_time: 50, file_print: 42 }, 5);
        detect_moves(&mut tree, &ids, &db, ComparisonVariant::TimeSize, &TimeTolerance::default());
        match tree.get(l).unwrap() {
            SyncItem::File(f) => assert_eq!(f.move_ref, Some(r)),
            _ => panic!(),
        }
        match tree.get(r).unwrap() {
            SyncItem::File(f) => assert_eq!(f.move_ref, Some(l)),
            _ => panic!(),
        }
    }

    #[test]
    fn duplicate_print_on_one_side_purges_both() {
        let mut tree = PairTree::new();
        let l1 = push_left_only(&mut tree, "a", 1, 1, 7);
        let l2 = push_left_only(&mut tree, "b", 1, 1, 7);
        let r = push_right_only(&mut tree, "c", 1, 1, 7);
        let ids = vec![l1, l2, r];
        let db = LastSyncState::new();
        detect_moves(&mut tree, &ids, &db, ComparisonVariant::TimeSize, &TimeTolerance::default());
        for id in [l1, l2, r] {
            match tree.get(id).unwrap() {
                SyncItem::File(f) => assert_eq!(f.move_ref, None),
                _ => panic!(),
            }
        }
    }

    #[test]
    fn zero_print_never_matches_with_no_db() {
        let mut tree = PairTree::new();
        let l = push_left_only(&mut tree, "a", 1, 1, 0);
        let r = push_right_only(&mut tree, "b", 1, 1, 0);
        let ids = vec![l, r];
        let db = LastSyncState::new();
        detect_moves(&mut tree, &ids, &db, ComparisonVariant::TimeSize, &TimeTolerance::default());
        match tree.get(l).unwrap() {
            SyncItem::File(f) => assert_eq!(f.move_ref, None),
            _ => panic!(),
        }
    }

    #[test]
    fn stale_db_record_is_not_used_for_pairing() {
        // current variant is content, DB recorded under time-size: stale,
        // so this DB entry must not drive a pairing even though a matching
        // path candidate exists.
        let mut tree = PairTree::new();
        let l = push_left_only(&mut tree, "moved/c.txt", 5, 50, 42);
        let r = push_right_only(&mut tree, "sub/c.txt", 5, 50, 42);
        let ids = vec![l, r];
        let mut db = LastSyncState::new();
        db.record_file_with_variant(
            "sub/c.txt",
            DescrFile { mod_time: 50, file_print: 42 },
            DescrFile { mod_time: 50, file_print: 42 },
            5,
            ComparisonVariant::TimeSize,
        );
        detect_moves(&mut tree, &ids, &db, ComparisonVariant::Content, &TimeTolerance::default());
        match tree.get(l).unwrap() {
            SyncItem::File(f) => assert_eq!(f.move_ref, None),
            _ => panic!(),
        }
    }
}
