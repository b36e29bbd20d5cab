use std::marker::PhantomData;
use std::ops::Range;

/// A mutable slice handed to every worker at once.
///
/// Workers only ever materialize sub-slices for ranges owned by the node they
/// have claimed, and the task tree guarantees that any two nodes runnable at
/// the same time cover disjoint ranges.
pub(crate) struct SharedSlice<'a> {
    ptr: *mut i32,
    len: usize,
    _marker: PhantomData<&'a mut [i32]>,
}

// Safety: access is partitioned by the task tree, see `range_mut`.
unsafe impl Send for SharedSlice<'_> {}
unsafe impl Sync for SharedSlice<'_> {}

impl<'a> SharedSlice<'a> {
    pub(crate) fn new(nums: &'a mut [i32]) -> Self {
        Self {
            ptr: nums.as_mut_ptr(),
            len: nums.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// No other live reference may overlap `range` while the returned slice is in use.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn range_mut(&self, range: Range<usize>) -> &mut [i32] {
        assert!(range.start <= range.end && range.end <= self.len);
        // Safety: in bounds per the assert; exclusivity is the caller's contract.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len()) }
    }
}
