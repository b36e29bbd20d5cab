//! Two-way merging and the bottom-up merge sort used for leaf ranges.
//!
//! Everything here works on a local sub-slice (`run`) plus a scratch buffer;
//! the index-based wrappers at the bottom translate `[low, high)` bounds on a
//! whole sequence into such sub-slices.

use crate::error::{SortError, check_range};

/// Stably merges the sorted halves `run[..mid]` and `run[mid..]` in place.
///
/// `temp` must hold at least `run.len()` elements. Equal elements keep the
/// left half first.
pub(crate) fn merge_with(run: &mut [i32], mid: usize, temp: &mut [i32]) {
    let high = run.len();
    debug_assert!(mid <= high);
    debug_assert!(temp.len() >= high);
    if mid == 0 || mid == high {
        return;
    }

    let mut out = 0;
    let mut lo = 0;
    let mut hi = mid;
    while lo < mid && hi < high {
        if run[hi] < run[lo] {
            temp[out] = run[hi];
            hi += 1;
        } else {
            temp[out] = run[lo];
            lo += 1;
        }
        out += 1;
    }

    if lo == mid {
        // The unconsumed tail of the right half is already in its final place.
        run[..out].copy_from_slice(&temp[..out]);
        return;
    }
    temp[out..high].copy_from_slice(&run[lo..mid]);
    run.copy_from_slice(&temp[..high]);
}

/// One pass of the bottom-up sort: merges every adjacent pair of `size`-long runs.
///
/// A trailing remainder no longer than `size` is left for a later pass.
fn merge_level(run: &mut [i32], size: usize, temp: &mut [i32]) {
    let merged = size * 2;
    let rem = run.len() % merged;
    let full = run.len() - rem;
    for pair in run[..full].chunks_exact_mut(merged) {
        merge_with(pair, size, temp);
    }
    if rem > size {
        merge_with(&mut run[full..], size, temp);
    }
}

/// Sorts `run` with an iterative bottom-up merge sort, growing `scratch` as needed.
pub fn sort_run(run: &mut [i32], scratch: &mut Vec<i32>) -> Result<(), SortError> {
    let len = run.len();
    if len < 2 {
        return Ok(());
    }
    let temp = scratch_slice(scratch, len)?;
    let mut size = 1;
    while size < len {
        merge_level(run, size, temp);
        size *= 2;
    }
    Ok(())
}

/// Returns the first `len` elements of `buf`, growing it fallibly first.
pub(crate) fn scratch_slice(buf: &mut Vec<i32>, len: usize) -> Result<&mut [i32], SortError> {
    if buf.len() < len {
        buf.try_reserve_exact(len - buf.len())
            .map_err(|source| SortError::Alloc {
                what: "merge buffer",
                len,
                source,
            })?;
        buf.resize(len, 0);
    }
    Ok(&mut buf[..len])
}

/// Sorts `nums[low..high]` ascending on the calling thread.
pub fn sequential_sort(nums: &mut [i32], low: usize, high: usize) -> Result<(), SortError> {
    check_range(nums.len(), low, high)?;
    let mut scratch = Vec::new();
    sort_run(&mut nums[low..high], &mut scratch)
}

/// Merges the sorted ranges `nums[low..mid]` and `nums[mid..high]`.
pub fn merge(nums: &mut [i32], low: usize, mid: usize, high: usize) -> Result<(), SortError> {
    check_range(nums.len(), low, high)?;
    check_range(high, low, mid)?;
    let mut scratch = Vec::new();
    let temp = scratch_slice(&mut scratch, high - low)?;
    merge_with(&mut nums[low..high], mid - low, temp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_vec(rng: &mut fastrand::Rng, len: usize) -> Vec<i32> {
        (0..len).map(|_| rng.i32(-1000..1000)).collect()
    }

    #[test]
    fn merges_interleaved_halves() {
        let mut nums = vec![1, 4, 6, 2, 3, 5, 7];
        merge(&mut nums, 0, 3, 7).unwrap();
        assert_eq!(nums, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn merge_with_left_exhausted_first() {
        let mut run = [1, 2, 3, 4, 5, 6];
        let mut temp = [0; 6];
        merge_with(&mut run, 2, &mut temp);
        assert_eq!(run, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn merge_with_right_exhausted_first() {
        let mut run = [4, 5, 6, 1, 2];
        let mut temp = [0; 5];
        merge_with(&mut run, 3, &mut temp);
        assert_eq!(run, [1, 2, 4, 5, 6]);
    }

    #[test]
    fn merge_with_empty_side_is_noop() {
        let mut run = [3, 1, 2];
        let mut temp = [0; 3];
        merge_with(&mut run, 0, &mut temp);
        assert_eq!(run, [3, 1, 2]);
        merge_with(&mut run, 3, &mut temp);
        assert_eq!(run, [3, 1, 2]);
    }

    #[test]
    fn merge_single_elements() {
        let mut nums = vec![9, 2];
        merge(&mut nums, 0, 1, 2).unwrap();
        assert_eq!(nums, [2, 9]);
    }

    #[test]
    fn merge_with_duplicates() {
        let mut run = [1, 3, 3, 5, 3, 3, 4];
        let mut temp = [0; 7];
        merge_with(&mut run, 4, &mut temp);
        assert_eq!(run, [1, 3, 3, 3, 3, 4, 5]);
    }

    #[test]
    fn merge_only_touches_its_range() {
        let mut nums = vec![100, 5, 7, 1, 6, -100];
        merge(&mut nums, 1, 3, 5).unwrap();
        assert_eq!(nums, [100, 1, 5, 6, 7, -100]);
    }

    #[test]
    fn sort_run_handles_odd_lengths() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut scratch = Vec::new();
        for len in [0, 1, 2, 3, 5, 7, 9, 33, 100, 1023, 1025] {
            let mut nums = random_vec(&mut rng, len);
            let mut expected = nums.clone();
            expected.sort();
            sort_run(&mut nums, &mut scratch).unwrap();
            assert_eq!(nums, expected, "len {len}");
        }
    }

    #[test]
    fn sequential_sort_subrange() {
        let mut nums = vec![9, 8, 7, 6, 5, 4, 3];
        sequential_sort(&mut nums, 2, 6).unwrap();
        assert_eq!(nums, [9, 8, 4, 5, 6, 7, 3]);
    }

    #[test]
    fn rejects_bad_ranges() {
        let mut nums = vec![1, 2, 3];
        assert!(matches!(
            sequential_sort(&mut nums, 2, 1),
            Err(SortError::Range { low: 2, high: 1, len: 3 })
        ));
        assert!(matches!(sequential_sort(&mut nums, 0, 4), Err(SortError::Range { .. })));
        assert!(matches!(merge(&mut nums, 1, 0, 3), Err(SortError::Range { .. })));
        assert!(matches!(merge(&mut nums, 0, 4, 3), Err(SortError::Range { .. })));
    }

    #[test]
    fn scratch_grows_and_reuses() {
        let mut buf = Vec::new();
        assert_eq!(scratch_slice(&mut buf, 4).unwrap().len(), 4);
        assert_eq!(scratch_slice(&mut buf, 2).unwrap().len(), 2);
        assert_eq!(buf.len(), 4);
    }
}
