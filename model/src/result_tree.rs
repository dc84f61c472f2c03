use crate::slot::ResultStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node in the canonical, recursive result tree produced by the post-processor (§3, §4.5).
/// Leaves represent individual tests or files; non-leaves aggregate their children's status per
/// the rollup law in §3: `failed` if any descendant is `failed`/`timeout`, else `passed` if any
/// descendant `passed`, else `skipped`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub name: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ResultItem>,
}

impl ResultItem {
    pub fn leaf(name: impl Into<String>, status: ResultStatus) -> Self {
        Self {
            name: name.into(),
            status,
            metadata: BTreeMap::new(),
            details: BTreeMap::new(),
            items: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, items: Vec<ResultItem>) -> Self {
        let mut item = Self {
            name: name.into(),
            status: ResultStatus::Unknown,
            metadata: BTreeMap::new(),
            details: BTreeMap::new(),
            items,
        };
        item.status = item.rolled_up_status();
        item
    }

    /// Computes this item's status from its children without mutating it, per the rollup law.
    /// Leaves (no children) report their own stored status unchanged.
    pub fn rolled_up_status(&self) -> ResultStatus {
        if self.items.is_empty() {
            return self.status.clone();
        }
        let mut any_failed = false;
        let mut any_passed = false;
        for child in &self.items {
            match child.rolled_up_status() {
                ResultStatus::Failed => any_failed = true,
                // Timeout is a custom status string produced by the timeout watcher; treat it
                // the same as Failed for rollup purposes.
                ResultStatus::Other(s) if s == "timeout" => any_failed = true,
                ResultStatus::Passed => any_passed = true,
                _ => {}
            }
        }
        if any_failed {
            ResultStatus::Failed
        } else if any_passed {
            ResultStatus::Passed
        } else {
            ResultStatus::Other("skipped".to_string())
        }
    }

    /// Recursively recomputes `status` for this item and every descendant, leaves-first. This is
    /// the post-processor's rollup pass (§4.5 step 1).
    pub fn recompute_rollup(&mut self) {
        for child in &mut self.items {
            child.recompute_rollup();
        }
        if !self.items.is_empty() {
            self.status = self.rolled_up_status();
        }
    }

    /// Walks the tree depth-first, lexicographic child order (the post-processor must build
    /// `items` in lexicographic traversal order already; this just counts leaves).
    pub fn leaf_counts(&self) -> LeafCounts {
        let mut counts = LeafCounts::default();
        self.accumulate(&mut counts);
        counts
    }

    fn accumulate(&self, counts: &mut LeafCounts) {
        if self.items.is_empty() {
            counts.total += 1;
            match &self.status {
                ResultStatus::Passed => counts.passed += 1,
                ResultStatus::Failed => counts.failed += 1,
                ResultStatus::Unknown => counts.unknown += 1,
                ResultStatus::Other(s) if s == "timeout" => counts.failed += 1,
                ResultStatus::Other(s) if s == "skipped" => counts.skipped += 1,
                ResultStatus::Other(_) => counts.unknown += 1,
            }
        } else {
            for child in &self.items {
                child.accumulate(counts);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct LeafCounts {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub unknown: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_status_is_unchanged_by_rollup() {
        let mut leaf = ResultItem::leaf("case-1", ResultStatus::Passed);
        leaf.recompute_rollup();
        assert_eq!(leaf.status, ResultStatus::Passed);
    }

    #[test]
    fn failed_descendant_fails_the_root() {
        let tree = ResultItem::branch(
            "suite",
            vec![
                ResultItem::leaf("a", ResultStatus::Passed),
                ResultItem::leaf("b", ResultStatus::Failed),
            ],
        );
        assert_eq!(tree.status, ResultStatus::Failed);
    }

    #[test]
    fn all_skipped_rolls_up_to_skipped() {
        let tree = ResultItem::branch(
            "suite",
            vec![
                ResultItem::leaf("a", ResultStatus::Other("skipped".to_string())),
                ResultItem::leaf("b", ResultStatus::Other("skipped".to_string())),
            ],
        );
        assert_eq!(tree.status, ResultStatus::Other("skipped".to_string()));
    }

    #[test]
    fn passed_with_no_failures_rolls_up_to_passed() {
        let tree = ResultItem::branch(
            "suite",
            vec![
                ResultItem::leaf("a", ResultStatus::Passed),
                ResultItem::leaf("b", ResultStatus::Other("skipped".to_string())),
            ],
        );
        assert_eq!(tree.status, ResultStatus::Passed);
    }

    #[test]
    fn leaf_counts_only_count_leaves() {
        let tree = ResultItem::branch(
            "suite",
            vec![
                ResultItem::leaf("a", ResultStatus::Passed),
                ResultItem::leaf("b", ResultStatus::Failed),
                ResultItem::branch(
                    "nested",
                    vec![ResultItem::leaf("c", ResultStatus::Passed)],
                ),
            ],
        );
        let counts = tree.leaf_counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.passed, 2);
        assert_eq!(counts.failed, 1);
    }
}
