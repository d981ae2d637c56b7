//! Comparison-variant and time-tolerance policy shared by the category
//! engine, direction resolver, and move detector.

/// How two present-on-both-sides items are compared to decide equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonVariant {
    /// Size and modification time (the common case; cheap, metadata-only).
    TimeSize,
    /// Full byte-for-byte content comparison; mod-time is ignored.
    Content,
    /// Size only; a weak invariant used when neither time nor content is reliable.
    Size,
}

/// FAT/FAT32 has 2-second modification-time precision; comparisons against
/// the last-sync database always tolerate at least this much drift,
/// regardless of the user's configured `file_time_tolerance`.
pub const FAT_TIME_TOLERANCE_SECS: i64 = 2;

/// Reserved suffix marking a copy-in-progress artifact. Items with this
/// suffix present on exactly one side are always scheduled for deletion on
/// that side, regardless of the configured sync policy.
pub const TEMP_FILE_SUFFIX: &str = ".orbit_tmp";

/// Time-comparison tolerance plus a whitelist of shift multiples (e.g. for
/// daylight-saving or FAT-vs-NTFS rounding differences recorded in whole
/// minutes).
#[derive(Debug, Clone)]
pub struct TimeTolerance {
    pub tolerance_secs: i64,
    pub shift_minutes: Vec<i64>,
}

impl Default for TimeTolerance {
    fn default() -> Self {
        Self {
            tolerance_secs: 2,
            shift_minutes: Vec::new(),
        }
    }
}

impl TimeTolerance {
    pub fn new(tolerance_secs: i64, shift_minutes: Vec<i64>) -> Self {
        Self {
            tolerance_secs,
            shift_minutes,
        }
    }

    /// `abs(a - b) <= tolerance`, modulo any whitelisted shift: the residual
    /// after subtracting a shift multiple must itself fall within tolerance.
    pub fn times_match(&self, a: i64, b: i64) -> bool {
        Self::within(a, b, self.tolerance_secs, &self.shift_minutes)
    }

    /// Same check but with the FAT floor applied as a lower bound on
    /// tolerance, for comparisons against the last-sync database.
    pub fn times_match_db(&self, a: i64, b: i64) -> bool {
        let tolerance = self.tolerance_secs.max(FAT_TIME_TOLERANCE_SECS);
        Self::within(a, b, tolerance, &self.shift_minutes)
    }

    fn within(a: i64, b: i64, tolerance: i64, shift_minutes: &[i64]) -> bool {
        let diff = (a - b).abs();
        if diff <= tolerance {
            return true;
        }
        shift_minutes
            .iter()
            .any(|m| (diff - m.abs() * 60).abs() <= tolerance)
    }
}

/// One-way policy: maps each non-equal category directly to a direction.
/// `none` on `conflict` means "propagate as conflict" rather than suppressing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDirection {
    None,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct OneWayPolicy {
    pub ex_left_only: PolicyDirection,
    pub ex_right_only: PolicyDirection,
    pub left_newer: PolicyDirection,
    pub right_newer: PolicyDirection,
    pub different: PolicyDirection,
    pub conflict: PolicyDirection,
}

impl OneWayPolicy {
    /// "Mirror": make right look like left.
    pub fn mirror() -> Self {
        Self {
            ex_left_only: PolicyDirection::Right,
            ex_right_only: PolicyDirection::Right,
            left_newer: PolicyDirection::Right,
            right_newer: PolicyDirection::Right,
            different: PolicyDirection::Right,
            conflict: PolicyDirection::None,
        }
    }

    /// "Update": only ever copy newer/missing items to the other side, never delete.
    pub fn update() -> Self {
        Self {
            ex_left_only: PolicyDirection::Right,
            ex_right_only: PolicyDirection::None,
            left_newer: PolicyDirection::Right,
            right_newer: PolicyDirection::None,
            different: PolicyDirection::None,
            conflict: PolicyDirection::None,
        }
    }

    /// Overwrite the older side with the newer one; used for the
    /// first-run two-way fallback when no last-sync database exists yet.
    pub fn newer_wins() -> Self {
        Self {
            ex_left_only: PolicyDirection::Right,
            ex_right_only: PolicyDirection::Left,
            left_newer: PolicyDirection::Right,
            right_newer: PolicyDirection::Left,
            different: PolicyDirection::None,
            conflict: PolicyDirection::None,
        }
    }
}

/// Top-level direction-resolution strategy for a base pair.
#[derive(Debug, Clone)]
pub enum SyncPolicy {
    OneWay {
        policy: OneWayPolicy,
        detect_moves: bool,
    },
    TwoWay {
        detect_moves: bool,
    },
}

impl SyncPolicy {
    pub fn detect_moves(&self) -> bool {
        match self {
            SyncPolicy::OneWay { detect_moves, .. } => *detect_moves,
            SyncPolicy::TwoWay { detect_moves } => *detect_moves,
        }
    }
}
