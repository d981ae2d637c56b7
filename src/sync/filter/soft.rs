//! Soft filter: time/size bounds that hide an item from the proposed
//! action without hiding it from the tree. Unlike the hard filter, an
//! item excluded here keeps its category (so the UI can still show what
//! changed) but its direction is forced to `none`.

use orbit_core_interface::{FileAttrs, SymlinkAttrs};

/// Inclusive modification-time bound, seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub from: i64,
    pub to: i64,
}

impl TimeSpan {
    pub fn contains(&self, mod_time: i64) -> bool {
        mod_time >= self.from && mod_time <= self.to
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoftFilter {
    pub time_span: Option<TimeSpan>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl SoftFilter {
    fn side_matches(&self, attrs: &FileAttrs) -> bool {
        if let Some(span) = self.time_span {
            if !span.contains(attrs.mod_time) {
                return false;
            }
        }
        if let Some(min) = self.min_size {
            if attrs.size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if attrs.size > max {
                return false;
            }
        }
        true
    }

    /// Two-sided file match: active iff *either* present side matches
    /// (spec.md 4.5's time-span convenience). A side that's absent (the
    /// item doesn't exist there) contributes no match.
    pub fn matches_file(&self, left: Option<&FileAttrs>, right: Option<&FileAttrs>) -> bool {
        left.map(|a| self.side_matches(a)).unwrap_or(false) || right.map(|a| self.side_matches(a)).unwrap_or(false)
    }

    /// Symlinks carry no size, so only the time span applies; size bounds
    /// are vacuously satisfied.
    pub fn matches_symlink(&self, left: Option<&SymlinkAttrs>, right: Option<&SymlinkAttrs>) -> bool {
        let side_matches = |a: &SymlinkAttrs| self.time_span.map(|span| span.contains(a.mod_time)).unwrap_or(true);
        left.map(side_matches).unwrap_or(false) || right.map(side_matches).unwrap_or(false)
    }

    /// Folders carry no size and, under a time-span filter, no modification
    /// time worth comparing -- they're always deactivated so a time/size
    /// scope doesn't leave a forest of empty, unreadable folder rows
    /// standing in for the files it actually excluded. Descendants are
    /// still evaluated individually; this only affects the folder node.
    pub fn matches_folder(&self) -> bool {
        self.time_span.is_none()
    }
}
