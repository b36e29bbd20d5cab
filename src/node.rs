//! A single unit of work in the task tree and its claim protocol.
//!
//! A node moves `Pending -> InProgress -> Done` exactly once. Readiness is
//! first checked without the node lock so idle scans do not contend, then
//! re-checked under the lock before the claiming thread commits to the work.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Index of a node inside a [`WorkTree`](crate::WorkTree) arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node does once claimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Leaf: fully sort an unsorted range.
    Sort,
    /// Branch: merge the sorted halves `[low, mid)` and `[mid, high)`.
    Merge { mid: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    InProgress,
    Done,
}

pub struct WorkNode {
    low: usize,
    high: usize,
    job: Job,
    children: Option<(NodeId, NodeId)>,
    is_done: AtomicBool,
    in_progress: AtomicBool,
    lock: Mutex<()>,
}

impl WorkNode {
    pub(crate) fn leaf(low: usize, high: usize) -> Self {
        Self {
            low,
            high,
            job: Job::Sort,
            children: None,
            is_done: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// A branch covering both children; `left` must end where `right` starts.
    pub(crate) fn branch(
        left_id: NodeId,
        left: &WorkNode,
        right_id: NodeId,
        right: &WorkNode,
    ) -> Self {
        debug_assert_eq!(left.high, right.low);
        Self {
            low: left.low,
            high: right.high,
            job: Job::Merge { mid: right.low },
            children: Some((left_id, right_id)),
            is_done: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn range(&self) -> Range<usize> {
        self.low..self.high
    }

    pub fn job(&self) -> Job {
        self.job
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.is_done.load(Ordering::Acquire)
    }

    pub fn state(&self) -> NodeState {
        if self.is_done() {
            NodeState::Done
        } else if self.in_progress.load(Ordering::Acquire) {
            NodeState::InProgress
        } else {
            NodeState::Pending
        }
    }

    /// Not done, not claimed, and every child (if any) is done.
    ///
    /// The Acquire loads of the children's flags make their sorted output
    /// visible to whoever goes on to merge it.
    pub fn is_ready(&self, nodes: &[WorkNode]) -> bool {
        if self.is_done() || self.in_progress.load(Ordering::Acquire) {
            return false;
        }
        match self.children {
            None => true,
            Some((left, right)) => nodes[left.0].is_done() && nodes[right.0].is_done(),
        }
    }

    /// Claims the node and runs `work` on it if it is ready.
    ///
    /// Returns `Ok(false)` when the node was not ready or another thread won the
    /// claim. The lock is held until `is_done` is published. If `work` fails the
    /// node stays `InProgress` and is never retried.
    pub fn try_claim<E>(
        &self,
        nodes: &[WorkNode],
        work: impl FnOnce(&WorkNode) -> Result<(), E>,
    ) -> Result<bool, E> {
        if !self.is_ready(nodes) {
            return Ok(false);
        }
        let _guard = self.lock.lock();
        if !self.is_ready(nodes) {
            return Ok(false);
        }
        self.in_progress.store(true, Ordering::Release);
        work(self)?;
        self.is_done.store(true, Ordering::Release);
        Ok(true)
    }
}
