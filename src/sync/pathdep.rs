//! Path-Dependency Check: rejects a set of configured folder pairs where
//! one pair's root is nested inside another pair's root *on the same
//! device*, since traversing both would double-count (or, for bulk
//! delete, double-remove) everything under the inner root.

use super::filter::HardFilter;
use orbit_core_interface::{OrbitSystem, RelPath};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PathDependencyError {
    pub outer: RelPath,
    pub inner: RelPath,
}

impl std::fmt::Display for PathDependencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "folder pair root '{}' is nested inside '{}' on the same device",
            self.inner.as_str(),
            self.outer.as_str()
        )
    }
}

impl std::error::Error for PathDependencyError {}

/// One side of one configured folder pair, as input to the check. `filter`
/// is the outer root's own hard filter, if any -- a nested root whose
/// relative path under the outer root is provably excluded by that filter
/// is not actually a read/write hazard, so it's not reported (spec.md 4.8).
pub struct RootRef<'a> {
    pub device: &'a Arc<dyn OrbitSystem>,
    pub root: &'a RelPath,
    pub filter: Option<&'a HardFilter>,
}

impl<'a> RootRef<'a> {
    pub fn new(device: &'a Arc<dyn OrbitSystem>, root: &'a RelPath) -> Self {
        Self {
            device,
            root,
            filter: None,
        }
    }

    pub fn with_filter(device: &'a Arc<dyn OrbitSystem>, root: &'a RelPath, filter: &'a HardFilter) -> Self {
        Self {
            device,
            root,
            filter: Some(filter),
        }
    }
}

/// Checks every combination of roots for nesting on the same device.
/// Two roots on different (non-equivalent) devices never conflict, even if
/// their path strings happen to collide.
pub fn check_no_nested_roots(roots: &[RootRef<'_>]) -> Result<(), PathDependencyError> {
    for (i, a) in roots.iter().enumerate() {
        for (j, b) in roots.iter().enumerate() {
            if i == j || !a.device.is_equivalent(b.device.as_ref()) {
                continue;
            }
            if a.root == b.root || !b.root.starts_with(a.root) {
                continue;
            }
            if let Some(filter) = a.filter {
                let rel = descendant_rel_path(a.root, b.root);
                if filter_definitely_excludes(filter, &rel) {
                    continue;
                }
            }
            return Err(PathDependencyError {
                outer: a.root.clone(),
                inner: b.root.clone(),
            });
        }
    }
    Ok(())
}

/// `inner`'s path relative to `outer` (both already confirmed nested).
fn descendant_rel_path(outer: &RelPath, inner: &RelPath) -> RelPath {
    if outer.is_root() {
        return inner.clone();
    }
    RelPath::new(
        inner
            .as_str()
            .strip_prefix(outer.as_str())
            .and_then(|s| s.strip_prefix('/'))
            .unwrap_or(inner.as_str()),
    )
}

/// True only when the outer filter's own traversal-pruning hint says
/// nothing beneath `rel` could ever match (spec.md 4.8's "would not
/// exclude... or might, if child_might_match" -- the same conservative
/// hint the hard filter gives the scanner in spec.md 4.5, reused here
/// rather than re-deriving a second notion of "definitely excluded").
fn filter_definitely_excludes(filter: &HardFilter, rel: &RelPath) -> bool {
    !filter.child_might_match(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[tokio::test]
    async fn nested_roots_on_same_device_rejected() {
        let device: Arc<dyn OrbitSystem> = Arc::new(MockSystem::new());
        let outer = RelPath::new("data");
        let inner = RelPath::new("data/sub");
        let roots = vec![RootRef::new(&device, &outer), RootRef::new(&device, &inner)];
        let err = check_no_nested_roots(&roots).unwrap_err();
        assert_eq!(err.outer, outer);
        assert_eq!(err.inner, inner);
    }

    #[tokio::test]
    async fn same_path_on_different_devices_is_fine() {
        let dev_a: Arc<dyn OrbitSystem> = Arc::new(MockSystem::with_id("a"));
        let dev_b: Arc<dyn OrbitSystem> = Arc::new(MockSystem::with_id("b"));
        let root = RelPath::new("data");
        let roots = vec![RootRef::new(&dev_a, &root), RootRef::new(&dev_b, &root)];
        assert!(check_no_nested_roots(&roots).is_ok());
    }

    #[tokio::test]
    async fn disjoint_roots_on_same_device_fine() {
        let device: Arc<dyn OrbitSystem> = Arc::new(MockSystem::new());
        let a = RelPath::new("data");
        let b = RelPath::new("backup");
        let roots = vec![RootRef::new(&device, &a), RootRef::new(&device, &b)];
        assert!(check_no_nested_roots(&roots).is_ok());
    }

    #[tokio::test]
    async fn nested_root_provably_excluded_by_filter_is_fine() {
        let device: Arc<dyn OrbitSystem> = Arc::new(MockSystem::new());
        let outer = RelPath::new("data");
        let inner = RelPath::new("data/build");
        let filter = HardFilter::new().exclude("build/**").unwrap();
        let roots = vec![RootRef::with_filter(&device, &outer, &filter), RootRef::new(&device, &inner)];
        assert!(check_no_nested_roots(&roots).is_ok());
    }

    #[tokio::test]
    async fn nested_root_ambiguously_excluded_by_filter_still_reported() {
        let device: Arc<dyn OrbitSystem> = Arc::new(MockSystem::new());
        let outer = RelPath::new("data");
        let inner = RelPath::new("data/build");
        // include carve-out means traversal wouldn't prune build/ outright.
        let filter = HardFilter::new()
            .exclude("build/**")
            .unwrap()
            .include("build/keep.txt")
            .unwrap();
        let roots = vec![RootRef::with_filter(&device, &outer, &filter), RootRef::new(&device, &inner)];
        assert!(check_no_nested_roots(&roots).is_err());
    }
}
