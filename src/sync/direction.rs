//! Direction Resolver: turns a pair's [`Category`] plus last-sync-state
//! context into a [`SyncDirection`] -- the action that will actually be
//! proposed for that item.

use super::category::Category;
use super::insync::DbVerdict;
use super::policy::{OneWayPolicy, PolicyDirection, SyncPolicy, TEMP_FILE_SUFFIX};

/// The resolved action for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDirection {
    /// No action; the item is already in sync (or excluded from propagation).
    None,
    /// Copy/delete/update so the left side matches.
    Left,
    /// Copy/delete/update so the right side matches.
    Right,
    /// Cannot resolve automatically; carries the reason forward from the
    /// category (or a resolver-specific reason, e.g. database mismatch).
    Conflict(String),
}

impl SyncDirection {
    pub fn is_active(&self) -> bool {
        !matches!(self, SyncDirection::None)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncDirection::Conflict(_))
    }
}

fn policy_direction_to_sync(d: PolicyDirection, reason_on_conflict: Option<String>) -> SyncDirection {
    match d {
        PolicyDirection::None => match reason_on_conflict {
            Some(r) => SyncDirection::Conflict(r),
            None => SyncDirection::None,
        },
        PolicyDirection::Left => SyncDirection::Left,
        PolicyDirection::Right => SyncDirection::Right,
    }
}

fn resolve_one_way(category: &Category, policy: &OneWayPolicy) -> SyncDirection {
    match category {
        Category::Equal => SyncDirection::None,
        Category::LeftOnly => policy_direction_to_sync(policy.ex_left_only, None),
        Category::RightOnly => policy_direction_to_sync(policy.ex_right_only, None),
        Category::LeftNewer => policy_direction_to_sync(policy.left_newer, None),
        Category::RightNewer => policy_direction_to_sync(policy.right_newer, None),
        Category::DifferentContent | Category::DifferentMetadata => {
            policy_direction_to_sync(policy.different, None)
        }
        Category::Conflict(reason) => {
            policy_direction_to_sync(policy.conflict, Some(reason.clone()))
        }
    }
}

/// First-run fallback for a path the database has nothing recorded for --
/// either the whole base pair has no database yet (spec.md 4.3 "initial run
/// fallback"), or this one path is new since the last recorded sync. Maps
/// each non-equal category directly through `first_run_policy`, same shape
/// as the one-way resolver.
fn resolve_no_record(category: &Category, first_run_policy: &OneWayPolicy) -> SyncDirection {
    resolve_one_way(category, first_run_policy)
}

/// Two-way, database-driven reconciliation (spec.md 4.3). `verdict` carries
/// the per-side match against the last-sync record plus whether that record
/// itself is still trustworthy under the current comparison variant; `None`
/// means no record exists for this path at all, which falls back to
/// `first_run_policy` rather than the exactly-one-side-changed logic below.
fn resolve_two_way(category: &Category, verdict: Option<&DbVerdict>, first_run_policy: &OneWayPolicy) -> SyncDirection {
    if let Category::Conflict(reason) = category {
        // A metadata-only mismatch the category engine already couldn't
        // resolve (e.g. same time, different size) is surfaced as-is; the
        // database can't adjudicate a disagreement the category engine
        // itself flagged as irreconcilable.
        return SyncDirection::Conflict(reason.clone());
    }
    if category.is_equal() {
        return SyncDirection::None;
    }

    let Some(verdict) = verdict else {
        return resolve_no_record(category, first_run_policy);
    };

    match (!verdict.left_matches, !verdict.right_matches) {
        (false, false) => SyncDirection::Conflict("no change since last synchronization".to_string()),
        (true, true) => SyncDirection::Conflict("both sides have changed since last synchronization".to_string()),
        (true, false) => {
            // Left changed, right didn't: propagate left's state onto right.
            if verdict.still_in_sync {
                SyncDirection::Right
            } else {
                SyncDirection::Conflict("database not in sync".to_string())
            }
        }
        (false, true) => {
            // Right changed, left didn't: propagate right's state onto left.
            if verdict.still_in_sync {
                SyncDirection::Left
            } else {
                SyncDirection::Conflict("database not in sync".to_string())
            }
        }
    }
}

/// Resolves a direction for one pair. `name` is the item's leaf name, used
/// only to recognize the reserved temp-file suffix, which always wins
/// regardless of policy: an in-progress copy artifact present on one side
/// only is deleted there, never propagated.
pub fn resolve_direction(
    name: &str,
    category: &Category,
    policy: &SyncPolicy,
    verdict: Option<&DbVerdict>,
) -> SyncDirection {
    if name.ends_with(TEMP_FILE_SUFFIX) {
        return match category {
            Category::LeftOnly => SyncDirection::Left,
            Category::RightOnly => SyncDirection::Right,
            _ => SyncDirection::None,
        };
    }

    match policy {
        SyncPolicy::OneWay { policy, .. } => resolve_one_way(category, policy),
        SyncPolicy::TwoWay { .. } => resolve_two_way(category, verdict, &OneWayPolicy::newer_wins()),
    }
}
