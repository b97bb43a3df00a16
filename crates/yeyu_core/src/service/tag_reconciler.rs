//! Tag-set reconciliation.
//!
//! Computes the minimal link changes that move an item from its current tag
//! ids to a desired set. Pure; callers apply the result.

use crate::model::tag::{TagDiff, TagId};
use std::collections::BTreeSet;

/// Returns `current − desired` to disconnect and `desired − current` to
/// connect. Duplicates collapse; both lists come back sorted ascending.
pub fn reconcile_tags(current: &[TagId], desired: &[TagId]) -> TagDiff {
    let current: BTreeSet<TagId> = current.iter().copied().collect();
    let desired: BTreeSet<TagId> = desired.iter().copied().collect();

    TagDiff {
        to_disconnect: current.difference(&desired).copied().collect(),
        to_connect: desired.difference(&current).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::reconcile_tags;
    use crate::model::tag::{TagDiff, TagId};
    use std::collections::BTreeSet;

    fn apply(current: &[TagId], diff: &TagDiff) -> BTreeSet<TagId> {
        let mut set: BTreeSet<TagId> = current.iter().copied().collect();
        for id in &diff.to_disconnect {
            set.remove(id);
        }
        set.extend(diff.to_connect.iter().copied());
        set
    }

    #[test]
    fn swaps_one_tag() {
        // a=1 b=2 c=3 d=4
        let diff = reconcile_tags(&[1, 2, 3], &[2, 3, 4]);
        assert_eq!(diff.to_disconnect, vec![1]);
        assert_eq!(diff.to_connect, vec![4]);
    }

    #[test]
    fn identical_sets_produce_empty_diff() {
        let diff = reconcile_tags(&[3, 1], &[1, 3, 3]);
        assert!(diff.is_empty());
    }

    #[test]
    fn applying_diff_always_yields_desired_set() {
        let cases: &[(&[TagId], &[TagId])] = &[
            (&[], &[]),
            (&[], &[1, 2, 3]),
            (&[1, 2, 3], &[]),
            (&[1, 1, 2], &[2, 2, 5]),
            (&[7, 8, 9], &[9, 8, 7]),
            (&[4], &[5, 6]),
        ];
        for (current, desired) in cases {
            let diff = reconcile_tags(current, desired);
            let expected: BTreeSet<TagId> = desired.iter().copied().collect();
            assert_eq!(apply(current, &diff), expected, "current={current:?}");
            assert!(diff
                .to_disconnect
                .iter()
                .all(|id| !diff.to_connect.contains(id)));
        }
    }
}
