//! Hard filter: the include/exclude rule set that decides whether an item
//! is scanned and compared at all. Items excluded here never get a
//! category or direction -- they're invisible to the rest of the engine,
//! as opposed to the soft filter (time/size) which still shows excluded
//! items but never proposes an action for them.

use glob::Pattern as GlobPattern;
use orbit_core_interface::RelPath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HardFilterError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    Include,
    Exclude,
}

#[derive(Debug, Clone)]
struct Rule {
    action: RuleAction,
    pattern: GlobPattern,
    raw: String,
}

/// First-match-wins glob rule list over forward-slash-normalized relative
/// paths. `+` and `-` rules are evaluated in the order added; a path that
/// matches none is included.
#[derive(Debug, Clone, Default)]
pub struct HardFilter {
    rules: Vec<Rule>,
}

impl HardFilter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn include(mut self, pattern: &str) -> Result<Self, HardFilterError> {
        self.add(RuleAction::Include, pattern)?;
        Ok(self)
    }

    pub fn exclude(mut self, pattern: &str) -> Result<Self, HardFilterError> {
        self.add(RuleAction::Exclude, pattern)?;
        Ok(self)
    }

    fn add(&mut self, action: RuleAction, pattern: &str) -> Result<(), HardFilterError> {
        let compiled = GlobPattern::new(pattern).map_err(|e| HardFilterError::InvalidGlob {
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.rules.push(Rule {
            action,
            pattern: compiled,
            raw: pattern.to_string(),
        });
        Ok(())
    }

    pub fn matches(&self, path: &RelPath) -> bool {
        let s = path.as_str();
        for rule in &self.rules {
            if rule.pattern.matches(s) {
                return rule.action == RuleAction::Include;
            }
        }
        true
    }

    /// Conservative pruning hint: false only when we can prove no path
    /// beneath `folder` could ever match an include rule, i.e. every rule
    /// whose pattern could apply under this folder is an unconditional
    /// subtree exclude (`prefix/**`) that matches the folder itself and
    /// carries no deeper include carve-out. When in doubt, returns true so
    /// the traversal never silently skips a folder it shouldn't.
    pub fn child_might_match(&self, folder: &RelPath) -> bool {
        let prefix = format!("{}/", folder.as_str());
        let mut excluded_subtree = false;
        for rule in &self.rules {
            let raw = rule.raw.trim_end_matches("/**");
            if raw == folder.as_str() && rule.raw.ends_with("/**") {
                match rule.action {
                    RuleAction::Exclude => excluded_subtree = true,
                    RuleAction::Include => return true,
                }
            } else if rule.raw.starts_with(&prefix) {
                // A rule reaches inside this folder specifically; can't prune.
                return true;
            }
        }
        !excluded_subtree
    }
}

/// Composes two hard filters so a path must satisfy both (used to combine
/// a global exclude list with a per-pair include scope).
#[derive(Debug, Clone)]
pub struct AndFilter {
    pub left: HardFilter,
    pub right: HardFilter,
}

impl AndFilter {
    pub fn matches(&self, path: &RelPath) -> bool {
        self.left.matches(path) && self.right.matches(path)
    }

    pub fn child_might_match(&self, folder: &RelPath) -> bool {
        self.left.child_might_match(folder) && self.right.child_might_match(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_includes_everything() {
        let f = HardFilter::new();
        assert!(f.matches(&RelPath::new("a/b.txt")));
    }

    #[test]
    fn exclude_glob_matches() {
        let f = HardFilter::new().exclude("*.tmp").unwrap();
        assert!(!f.matches(&RelPath::new("a.tmp")));
        assert!(f.matches(&RelPath::new("a.txt")));
    }

    #[test]
    fn first_match_wins() {
        let f = HardFilter::new()
            .exclude("*")
            .unwrap()
            .include("*.txt")
            .unwrap();
        // exclude("*") matches everything first, so include never triggers
        assert!(!f.matches(&RelPath::new("a.txt")));
    }

    #[test]
    fn subtree_exclude_prunes_child_walk() {
        let f = HardFilter::new().exclude("build/**").unwrap();
        assert!(!f.child_might_match(&RelPath::new("build")));
        assert!(f.child_might_match(&RelPath::new("src")));
    }

    #[test]
    fn nested_include_prevents_pruning() {
        let f = HardFilter::new()
            .exclude("build/**")
            .unwrap()
            .include("build/keep.txt")
            .unwrap();
        assert!(f.child_might_match(&RelPath::new("build")));
    }
}
