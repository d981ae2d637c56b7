//! Last-Sync State: the record of what each side looked like the last time
//! this base pair was successfully synchronized, loaded from whatever
//! on-disk database format the caller uses (out of scope here; this module
//! only defines the in-memory shape and the queries the resolver and move
//! detector need).

use super::policy::{ComparisonVariant, TimeTolerance};
use std::collections::HashMap;

/// One side's recorded description of a file as of the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescrFile {
    pub mod_time: i64,
    pub file_print: u64,
}

/// One side's recorded description of a symlink as of the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescrLink {
    pub mod_time: i64,
}

/// A folder's last-sync status. `StrawMan` marks a folder that was
/// synthesized to give a nested in-sync item a parent, not one that was
/// itself ever confirmed equal on both sides -- it must never by itself
/// justify deleting or overwriting a real folder, and it is never treated
/// as match evidence for the direction resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRecordStatus {
    Normal,
    StrawMan,
}

#[derive(Debug, Clone)]
pub struct InSyncFolder {
    pub status: FolderRecordStatus,
}

/// A file confirmed equal on both sides as of the last run. `size` is the
/// single size both sides agreed on at the time; `compare_variant_used`
/// records which [`ComparisonVariant`] produced that agreement, so a later
/// run under a stricter variant can recognize the record as stale.
#[derive(Debug, Clone)]
pub struct InSyncFile {
    pub left: DescrFile,
    pub right: DescrFile,
    pub size: u64,
    pub compare_variant_used: ComparisonVariant,
}

#[derive(Debug, Clone)]
pub struct InSyncSymlink {
    pub left: DescrLink,
    pub right: DescrLink,
    pub compare_variant_used: ComparisonVariant,
}

/// What the direction resolver (and move detector) learn from comparing a
/// path's current attributes against its last-sync record: whether each
/// side still matches what was recorded, and whether the record itself
/// would still be trusted as "in sync" under the currently configured
/// comparison variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbVerdict {
    pub left_matches: bool,
    pub right_matches: bool,
    pub still_in_sync: bool,
}

/// Cross-variant DB acceptance, asymmetric by design (spec.md 9's open
/// question: do not generalize past these three rules):
/// - current variant `time-size`: a `content` DB record always passes
///   (byte-equality is strictly stronger evidence); otherwise the two
///   recorded mod-times must themselves still agree within tolerance.
/// - current variant `content`: only a `content` DB record passes.
/// - current variant `size`: size alone is a weak invariant, always passes.
pub fn record_still_in_sync(
    current: ComparisonVariant,
    db_variant: ComparisonVariant,
    tolerance: &TimeTolerance,
    db_left_mtime: i64,
    db_right_mtime: i64,
) -> bool {
    match current {
        ComparisonVariant::TimeSize => {
            db_variant == ComparisonVariant::Content || tolerance.times_match_db(db_left_mtime, db_right_mtime)
        }
        ComparisonVariant::Content => db_variant == ComparisonVariant::Content,
        ComparisonVariant::Size => true,
    }
}

/// The full last-sync database for one base folder pair, keyed by the
/// relative path shared by both sides as of that run (paths are recorded
/// once per pair, not per side, since a record only exists once both sides
/// agreed).
#[derive(Debug, Clone, Default)]
pub struct LastSyncState {
    files: HashMap<String, InSyncFile>,
    symlinks: HashMap<String, InSyncSymlink>,
    folders: HashMap<String, InSyncFolder>,
}

impl LastSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, path: impl Into<String>, left: DescrFile, right: DescrFile, size: u64) {
        self.record_file_with_variant(path, left, right, size, ComparisonVariant::TimeSize)
    }

    pub fn record_file_with_variant(
        &mut self,
        path: impl Into<String>,
        left: DescrFile,
        right: DescrFile,
        size: u64,
        compare_variant_used: ComparisonVariant,
    ) {
        self.files.insert(
            path.into(),
            InSyncFile {
                left,
                right,
                size,
                compare_variant_used,
            },
        );
    }

    pub fn record_symlink(&mut self, path: impl Into<String>, left: DescrLink, right: DescrLink) {
        self.record_symlink_with_variant(path, left, right, ComparisonVariant::TimeSize)
    }

    pub fn record_symlink_with_variant(
        &mut self,
        path: impl Into<String>,
        left: DescrLink,
        right: DescrLink,
        compare_variant_used: ComparisonVariant,
    ) {
        self.symlinks.insert(
            path.into(),
            InSyncSymlink {
                left,
                right,
                compare_variant_used,
            },
        );
    }

    pub fn record_folder(&mut self, path: impl Into<String>, status: FolderRecordStatus) {
        self.folders.insert(path.into(), InSyncFolder { status });
    }

    pub fn file(&self, path: &str) -> Option<&InSyncFile> {
        self.files.get(path)
    }

    pub fn symlink(&self, path: &str) -> Option<&InSyncSymlink> {
        self.symlinks.get(path)
    }

    pub fn folder(&self, path: &str) -> Option<&InSyncFolder> {
        self.folders.get(path)
    }

    /// All recorded file entries, keyed by path -- the move detector's
    /// entry point (it walks the DB, not the tree, per spec.md 4.4 step 4).
    pub fn file_entries(&self) -> impl Iterator<Item = (&str, &InSyncFile)> {
        self.files.iter().map(|(p, f)| (p.as_str(), f))
    }

    /// The per-item matcher for files: size equal (to the DB's single
    /// recorded size) and modification time within FAT tolerance plus any
    /// whitelisted shift, evaluated independently for each side that's
    /// currently present.
    pub fn evaluate_file(
        &self,
        path: &str,
        current_left: Option<(u64, i64)>,
        current_right: Option<(u64, i64)>,
        variant: ComparisonVariant,
        tolerance: &TimeTolerance,
    ) -> Option<DbVerdict> {
        let rec = self.files.get(path)?;
        let left_matches = current_left
            .map(|(size, mtime)| size == rec.size && tolerance.times_match_db(mtime, rec.left.mod_time))
            .unwrap_or(false);
        let right_matches = current_right
            .map(|(size, mtime)| size == rec.size && tolerance.times_match_db(mtime, rec.right.mod_time))
            .unwrap_or(false);
        Some(DbVerdict {
            left_matches,
            right_matches,
            still_in_sync: record_still_in_sync(
                variant,
                rec.compare_variant_used,
                tolerance,
                rec.left.mod_time,
                rec.right.mod_time,
            ),
        })
    }

    /// The per-item matcher for symlinks: modification time within FAT
    /// tolerance plus shift allowance (symlinks have no size).
    pub fn evaluate_symlink(
        &self,
        path: &str,
        current_left: Option<i64>,
        current_right: Option<i64>,
        variant: ComparisonVariant,
        tolerance: &TimeTolerance,
    ) -> Option<DbVerdict> {
        let rec = self.symlinks.get(path)?;
        let left_matches = current_left
            .map(|mtime| tolerance.times_match_db(mtime, rec.left.mod_time))
            .unwrap_or(false);
        let right_matches = current_right
            .map(|mtime| tolerance.times_match_db(mtime, rec.right.mod_time))
            .unwrap_or(false);
        Some(DbVerdict {
            left_matches,
            right_matches,
            still_in_sync: record_still_in_sync(
                variant,
                rec.compare_variant_used,
                tolerance,
                rec.left.mod_time,
                rec.right.mod_time,
            ),
        })
    }

    /// The per-item matcher for folders: presence-matches-presence. A
    /// straw-man record is "not really there" -- it never counts as
    /// evidence either way, matching spec.md 9's guidance to treat it
    /// uniformly as a placeholder.
    pub fn evaluate_folder(&self, path: &str, current_left_present: bool, current_right_present: bool) -> Option<DbVerdict> {
        let rec = self.folders.get(path)?;
        if rec.status == FolderRecordStatus::StrawMan {
            return None;
        }
        Some(DbVerdict {
            left_matches: current_left_present,
            right_matches: current_right_present,
            still_in_sync: true,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.symlinks.is_empty() && self.folders.is_empty()
    }

    /// True if any recorded file carries `print` on either side. Used by the
    /// move detector's first-run fallback (no DB at all yet) to distinguish
    /// "genuinely nothing to check against" from "DB present but this print
    /// never seen", only relevant before a DB exists for the base pair.
    pub fn files_with_print(&self, print: u64) -> bool {
        self.files
            .values()
            .any(|f| f.left.file_print == print || f.right.file_print == print)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descr(mod_time: i64, print: u64) -> DescrFile {
        DescrFile { mod_time, file_print: print }
    }

    #[test]
    fn unknown_path_has_no_verdict() {
        let db = LastSyncState::new();
        assert!(db
            .evaluate_file("missing", Some((1, 1)), Some((1, 1)), ComparisonVariant::TimeSize, &TimeTolerance::default())
            .is_none());
    }

    #[test]
    fn one_side_changed_is_detected() {
        let mut db = LastSyncState::new();
        db.record_file("a.txt", descr(100, 0), descr(100, 0), 10);
        let tol = TimeTolerance::default();
        // Right now has a different mod time than the DB recorded; left unchanged.
        let verdict = db
            .evaluate_file("a.txt", Some((10, 100)), Some((10, 999)), ComparisonVariant::TimeSize, &tol)
            .unwrap();
        assert!(verdict.left_matches);
        assert!(!verdict.right_matches);
    }

    #[test]
    fn content_db_always_still_in_sync_under_time_size() {
        let tol = TimeTolerance::default();
        assert!(record_still_in_sync(
            ComparisonVariant::TimeSize,
            ComparisonVariant::Content,
            &tol,
            1,
            99999
        ));
    }

    #[test]
    fn time_size_db_stale_under_content_variant() {
        let tol = TimeTolerance::default();
        assert!(!record_still_in_sync(
            ComparisonVariant::Content,
            ComparisonVariant::TimeSize,
            &tol,
            1,
            1
        ));
    }

    #[test]
    fn size_variant_always_in_sync() {
        let tol = TimeTolerance::default();
        assert!(record_still_in_sync(ComparisonVariant::Size, ComparisonVariant::TimeSize, &tol, 1, 99999));
    }

    #[test]
    fn straw_man_folder_is_not_evidence() {
        let mut db = LastSyncState::new();
        db.record_folder("sub", FolderRecordStatus::StrawMan);
        assert!(db.evaluate_folder("sub", true, false).is_none());
    }

    #[test]
    fn normal_folder_presence_matches_presence() {
        let mut db = LastSyncState::new();
        db.record_folder("sub", FolderRecordStatus::Normal);
        let verdict = db.evaluate_folder("sub", true, false).unwrap();
        assert!(verdict.left_matches);
        assert!(!verdict.right_matches);
    }
}
