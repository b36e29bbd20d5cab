//! Validation predicates for sort results. Not used by the sort itself.

use std::collections::HashMap;

use foldhash::fast::RandomState as FoldRandomState;

/// Returns true if `nums` is non-decreasing. Empty and single-element sequences are sorted.
pub fn is_sorted(nums: &[i32]) -> bool {
    nums.windows(2).all(|w| w[0] <= w[1])
}

/// Returns true if `a` and `b` hold the same values with the same multiplicities.
pub fn same_multiset(a: &[i32], b: &[i32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<i32, isize, FoldRandomState> =
        HashMap::with_capacity_and_hasher(a.len(), FoldRandomState::default());
    for &x in a {
        *counts.entry(x).or_default() += 1;
    }
    for &x in b {
        match counts.get_mut(&x) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sortedness() {
        assert!(is_sorted(&[]));
        assert!(is_sorted(&[4]));
        assert!(is_sorted(&[1, 1, 2, 3]));
        assert!(!is_sorted(&[2, 1]));
    }

    #[test]
    fn multisets() {
        assert!(same_multiset(&[3, 1, 2, 1], &[1, 1, 2, 3]));
        assert!(!same_multiset(&[1, 1, 2], &[1, 2, 2]));
        assert!(!same_multiset(&[1], &[1, 1]));
        assert!(same_multiset(&[], &[]));
    }
}
