//! Change detection between two package-list snapshots.

use std::collections::HashMap;

use crate::types::{BuildState, PackageList};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub name: String,
    pub from: BuildState,
    pub to: BuildState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<StatusChange>,
}

impl StatusDiff {
    /// Compare aggregate statuses. Output order follows `next` for added and
    /// changed packages and `prev` for removed ones.
    pub fn between(prev: &PackageList, next: &PackageList) -> Self {
        let before: HashMap<&str, BuildState> = prev
            .packages
            .iter()
            .map(|p| (p.name.as_str(), p.aggregate_status()))
            .collect();
        let after: HashMap<&str, BuildState> = next
            .packages
            .iter()
            .map(|p| (p.name.as_str(), p.aggregate_status()))
            .collect();

        let mut diff = StatusDiff::default();
        for pkg in &next.packages {
            let to = pkg.aggregate_status();
            match before.get(pkg.name.as_str()) {
                None => diff.added.push(pkg.name.clone()),
                Some(&from) if from != to => diff.changed.push(StatusChange {
                    name: pkg.name.clone(),
                    from,
                    to,
                }),
                Some(_) => {}
            }
        }
        diff.removed = prev
            .packages
            .iter()
            .filter(|p| !after.contains_key(p.name.as_str()))
            .map(|p| p.name.clone())
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn touches(&self, name: &str) -> bool {
        self.added.iter().any(|n| n == name) || self.changed.iter().any(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageInfo, PackageType};

    fn list(entries: &[(&str, BuildState)]) -> PackageList {
        PackageList {
            packages: entries
                .iter()
                .map(|(name, status)| PackageInfo {
                    name: name.to_string(),
                    package_type: PackageType::Package,
                    stages: vec![],
                    status: Some(*status),
                })
                .collect(),
        }
    }

    #[test]
    fn identical_lists_have_empty_diff() {
        let a = list(&[("x", BuildState::Built)]);
        assert!(StatusDiff::between(&a, &a.clone()).is_empty());
    }

    #[test]
    fn detects_added_removed_changed() {
        let prev = list(&[("a", BuildState::Unbuilt), ("b", BuildState::Built)]);
        let next = list(&[("a", BuildState::Configured), ("c", BuildState::Unbuilt)]);
        let diff = StatusDiff::between(&prev, &next);
        assert_eq!(diff.added, vec!["c"]);
        assert_eq!(diff.removed, vec!["b"]);
        assert_eq!(
            diff.changed,
            vec![StatusChange {
                name: "a".into(),
                from: BuildState::Unbuilt,
                to: BuildState::Configured,
            }]
        );
        assert!(diff.touches("a"));
        assert!(diff.touches("c"));
        assert!(!diff.touches("b"));
    }

    #[test]
    fn backwards_status_is_still_a_change() {
        let prev = list(&[("a", BuildState::Installed)]);
        let next = list(&[("a", BuildState::Unbuilt)]);
        let diff = StatusDiff::between(&prev, &next);
        assert_eq!(diff.changed.len(), 1);
    }
}
