//! Category Engine: a pure function from a pair's two sides (plus whatever
//! out-of-band comparison the configured variant requires) to a [`Category`].
//! Carries no I/O and no knowledge of devices; callers that need a content or
//! target-string comparison run it themselves and hand in the verdict.

use super::policy::{ComparisonVariant, TimeTolerance};
use orbit_core_interface::{FileAttrs, FolderAttrs, SymlinkAttrs};

/// The outcome of comparing one pair's two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// Both sides present and equivalent under the configured variant.
    Equal,
    /// Present on the left only.
    LeftOnly,
    /// Present on the right only.
    RightOnly,
    /// Present on both sides; left is the newer version.
    LeftNewer,
    /// Present on both sides; right is the newer version.
    RightNewer,
    /// Present on both sides, unambiguously different, but neither side can
    /// be called newer (equal or unreadable timestamps).
    DifferentContent,
    /// Folders only: both present, same name, but attributes disagree in a
    /// way that doesn't map to a time ordering (e.g. symlink-following flag).
    DifferentMetadata,
    /// Ambiguous: both sides changed in ways that cannot be reconciled
    /// automatically. The string is a human-readable reason surfaced
    /// verbatim to the resolver and, eventually, the UI.
    Conflict(String),
}

impl Category {
    pub fn is_equal(&self) -> bool {
        matches!(self, Category::Equal)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Category::Conflict(_))
    }

    /// True for any category that leaves both sides present (i.e. not a
    /// one-side-only category) -- the candidate set the move detector
    /// ignores, since moves are defined over one-side-only items.
    pub fn both_sides_present(&self) -> bool {
        !matches!(self, Category::LeftOnly | Category::RightOnly)
    }
}

/// `left_newer`/`right_newer` are derived by the caller passing in each
/// side's effective modification time already adjusted for tolerance; this
/// helper just orders two raw timestamps once difference has been
/// established as significant by [`TimeTolerance::times_match`].
fn order_by_time(left_mtime: i64, right_mtime: i64) -> Category {
    if left_mtime > right_mtime {
        Category::LeftNewer
    } else {
        Category::RightNewer
    }
}

pub fn categorize_file(
    left: Option<&FileAttrs>,
    right: Option<&FileAttrs>,
    variant: ComparisonVariant,
    tolerance: &TimeTolerance,
    content_equal: Option<bool>,
) -> Category {
    let (left, right) = match (left, right) {
        (Some(_), None) => return Category::LeftOnly,
        (None, Some(_)) => return Category::RightOnly,
        (None, None) => return Category::Conflict("file missing on both sides".to_string()),
        (Some(l), Some(r)) => (l, r),
    };

    match variant {
        ComparisonVariant::TimeSize => {
            let same_size = left.size == right.size;
            let same_time = tolerance.times_match(left.mod_time, right.mod_time);
            match (same_size, same_time) {
                (true, true) => Category::Equal,
                (true, false) => order_by_time(left.mod_time, right.mod_time),
                (false, true) => {
                    Category::Conflict("same modification time, different size".to_string())
                }
                (false, false) => Category::DifferentContent,
            }
        }
        ComparisonVariant::Content => match content_equal {
            Some(true) => Category::Equal,
            Some(false) => Category::DifferentContent,
            None => Category::Conflict("content comparison not available".to_string()),
        },
        ComparisonVariant::Size => {
            if left.size == right.size {
                Category::Equal
            } else {
                Category::DifferentContent
            }
        }
    }
}

pub fn categorize_symlink(
    left: Option<&SymlinkAttrs>,
    right: Option<&SymlinkAttrs>,
    variant: ComparisonVariant,
    tolerance: &TimeTolerance,
    target_equal: Option<bool>,
) -> Category {
    let (left, right) = match (left, right) {
        (Some(_), None) => return Category::LeftOnly,
        (None, Some(_)) => return Category::RightOnly,
        (None, None) => return Category::Conflict("symlink missing on both sides".to_string()),
        (Some(l), Some(r)) => (l, r),
    };

    match variant {
        ComparisonVariant::TimeSize => {
            if tolerance.times_match(left.mod_time, right.mod_time) {
                Category::Equal
            } else {
                order_by_time(left.mod_time, right.mod_time)
            }
        }
        ComparisonVariant::Content | ComparisonVariant::Size => match target_equal {
            Some(true) => Category::Equal,
            Some(false) => Category::DifferentContent,
            None => Category::Conflict("symlink target comparison not available".to_string()),
        },
    }
}

/// Folders compare by presence and, when both sides exist, by metadata
/// only -- there is no folder "content" to diff and no useful notion of
/// newer/older, so any attribute mismatch not explained by presence is a
/// metadata-only difference rather than a time-ordered one.
pub fn categorize_folder(left: Option<&FolderAttrs>, right: Option<&FolderAttrs>) -> Category {
    match (left, right) {
        (Some(_), None) => Category::LeftOnly,
        (None, Some(_)) => Category::RightOnly,
        (None, None) => Category::Conflict("folder missing on both sides".to_string()),
        (Some(l), Some(r)) => {
            if l.is_followed_symlink != r.is_followed_symlink {
                Category::DifferentMetadata
            } else {
                Category::Equal
            }
        }
    }
}
