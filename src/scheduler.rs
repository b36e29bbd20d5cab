//! Worker pool that drains a [`WorkTree`] by scanning, claiming and executing nodes.
//!
//! Every worker walks the whole tree depth first (node, then left, then right)
//! looking for a node it can claim. When a scan comes up empty it parks on the
//! shared [`WakeSignal`] until some other worker finishes a node. Completing the
//! root, or aborting on error, broadcasts to every parked worker so all of them
//! observe the terminal state and exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::SortError;
use crate::merge::{merge_with, scratch_slice, sort_run};
use crate::node::{Job, NodeId, WorkNode};
use crate::shared::SharedSlice;
use crate::tree::WorkTree;

/// Coordination point for idle workers.
///
/// The epoch counts node completions. A worker samples it before scanning and
/// only parks if it is unchanged afterwards, so a completion racing with a
/// fruitless scan is never missed.
pub struct WakeSignal {
    epoch: Mutex<u64>,
    cv: Condvar,
    aborted: AtomicBool,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            epoch: Mutex::new(0),
            cv: Condvar::new(),
            aborted: AtomicBool::new(false),
        }
    }

    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Records a completion. Terminal completions wake every parked worker.
    pub fn notify(&self, terminal: bool) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        if terminal {
            self.cv.notify_all();
        } else {
            self.cv.notify_one();
        }
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.notify(true);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Parks while the epoch is still `seen`, `finished` is false and nobody aborted.
    ///
    /// Returns whether the caller actually parked.
    pub fn wait(&self, seen: u64, finished: impl Fn() -> bool) -> bool {
        let mut epoch = self.epoch.lock();
        let mut parked = false;
        while *epoch == seen && !finished() && !self.is_aborted() {
            self.cv.wait(&mut epoch);
            parked = true;
        }
        parked
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call scheduling counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Nodes in the task tree.
    pub nodes: usize,
    /// Jobs executed by each worker, indexed by worker.
    pub jobs: Vec<usize>,
    /// Times any worker parked on the wake signal.
    pub parks: usize,
}

impl ScheduleStats {
    pub fn total_jobs(&self) -> usize {
        self.jobs.iter().sum()
    }
}

struct WorkerReport {
    jobs: usize,
    parks: usize,
}

/// Aborts the run if the owning worker unwinds, so peers do not park forever.
struct AbortOnPanic<'a>(&'a WakeSignal);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

struct Worker<'a, 's> {
    index: usize,
    tree: &'a WorkTree,
    nums: &'a SharedSlice<'s>,
    signal: &'a WakeSignal,
    scratch: Vec<i32>,
    jobs: usize,
    parks: usize,
}

impl<'a, 's> Worker<'a, 's> {
    fn new(
        index: usize,
        tree: &'a WorkTree,
        nums: &'a SharedSlice<'s>,
        signal: &'a WakeSignal,
    ) -> Self {
        Self {
            index,
            tree,
            nums,
            signal,
            scratch: Vec::new(),
            jobs: 0,
            parks: 0,
        }
    }

    fn run(mut self) -> Result<WorkerReport, SortError> {
        let _guard = AbortOnPanic(self.signal);
        let tree = self.tree;
        while !tree.is_complete() && !self.signal.is_aborted() {
            let seen = self.signal.epoch();
            match self.scan(tree.root()) {
                Ok(true) => {}
                Ok(false) => {
                    if self.signal.wait(seen, || tree.is_complete()) {
                        self.parks += 1;
                    }
                }
                Err(err) => {
                    warn!(worker = self.index, error = %err, "aborting sort");
                    self.signal.abort();
                    return Err(err);
                }
            }
        }
        debug!(worker = self.index, jobs = self.jobs, parks = self.parks, "worker exiting");
        Ok(WorkerReport {
            jobs: self.jobs,
            parks: self.parks,
        })
    }

    /// Claims and executes the first ready node under `id`, in pre-order.
    fn scan(&mut self, id: NodeId) -> Result<bool, SortError> {
        if self.claim(id)? {
            return Ok(true);
        }
        if let Some((left, right)) = self.tree.node(id).children() {
            for child in [left, right] {
                if !self.tree.node(child).is_done() && self.scan(child)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn claim(&mut self, id: NodeId) -> Result<bool, SortError> {
        let tree = self.tree;
        let nums = self.nums;
        let scratch = &mut self.scratch;
        let claimed = tree
            .node(id)
            .try_claim(tree.nodes(), |node| execute(node, nums, scratch))?;
        if claimed {
            self.jobs += 1;
            trace!(worker = self.index, node = id.index(), "finished node");
            self.signal.notify(id == tree.root());
        }
        Ok(claimed)
    }
}

fn execute(
    node: &WorkNode,
    nums: &SharedSlice<'_>,
    scratch: &mut Vec<i32>,
) -> Result<(), SortError> {
    // Safety: this thread holds the claim on `node`. Its descendants are done and
    // will not be touched again, and its ancestors cannot be claimed until it is
    // done, so nothing else references this range.
    let run = unsafe { nums.range_mut(node.range()) };
    match node.job() {
        Job::Sort => sort_run(run, scratch),
        Job::Merge { mid } => {
            let temp = scratch_slice(scratch, run.len())?;
            merge_with(run, mid - node.low(), temp);
            Ok(())
        }
    }
}

fn join_worker(
    handle: thread::ScopedJoinHandle<'_, Result<WorkerReport, SortError>>,
) -> Result<WorkerReport, SortError> {
    handle.join().unwrap_or(Err(SortError::WorkerPanicked))
}

/// Sorts `nums` ascending in place using `workers` threads.
///
/// The slice is cut into one leaf per worker; leaves are sorted and then merged
/// pairwise up the task tree by whichever worker gets to each node first.
pub fn parallel_sort(nums: &mut [i32], workers: usize) -> Result<ScheduleStats, SortError> {
    if workers == 0 {
        return Err(SortError::NoWorkers);
    }
    debug!(len = nums.len(), workers, "starting parallel sort");
    let tree = WorkTree::build(nums.len(), workers)?;
    let signal = WakeSignal::new();
    let shared = SharedSlice::new(nums);

    let results = thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        let mut spawn_error = None;
        for index in 0..workers {
            let worker = Worker::new(index, &tree, &shared, &signal);
            let spawned = thread::Builder::new()
                .name(format!("sort-worker-{index}"))
                .spawn_scoped(s, move || worker.run());
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    warn!(worker = index, error = %source, "failed to spawn worker");
                    signal.abort();
                    spawn_error = Some(SortError::Spawn { index, source });
                    break;
                }
            }
        }
        let mut results: Vec<Result<WorkerReport, SortError>> = Vec::with_capacity(workers + 1);
        if let Some(err) = spawn_error {
            results.push(Err(err));
        }
        results.extend(
            handles
                .into_iter()
                .map(join_worker),
        );
        results
    });

    let mut stats = ScheduleStats {
        nodes: tree.node_count(),
        jobs: Vec::with_capacity(workers),
        parks: 0,
    };
    for result in results {
        let report = result?;
        stats.jobs.push(report.jobs);
        stats.parks += report.parks;
    }
    debug_assert!(tree.is_complete());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_epoch_moved() {
        let signal = WakeSignal::new();
        let seen = signal.epoch();
        signal.notify(false);
        assert!(!signal.wait(seen, || false));
    }

    #[test]
    fn wait_returns_immediately_when_finished() {
        let signal = WakeSignal::new();
        assert!(!signal.wait(signal.epoch(), || true));
    }

    #[test]
    fn terminal_notify_wakes_every_waiter() {
        let signal = WakeSignal::new();
        let seen = signal.epoch();
        thread::scope(|s| {
            let waiters: Vec<_> = (0..4)
                .map(|_| s.spawn(|| signal.wait(seen, || false)))
                .collect();
            thread::sleep(Duration::from_millis(20));
            signal.notify(true);
            for waiter in waiters {
                waiter.join().unwrap();
            }
        });
    }

    #[test]
    fn abort_wakes_and_sticks() {
        let signal = WakeSignal::new();
        let seen = signal.epoch();
        thread::scope(|s| {
            let waiter = s.spawn(|| signal.wait(seen, || false));
            thread::sleep(Duration::from_millis(20));
            signal.abort();
            waiter.join().unwrap();
        });
        assert!(signal.is_aborted());
        assert!(!signal.wait(signal.epoch(), || false));
    }

    #[test]
    fn panicking_worker_aborts_parked_peers() {
        let signal = WakeSignal::new();
        let seen = signal.epoch();
        thread::scope(|s| {
            let peer = s.spawn(|| signal.wait(seen, || false));
            let failing = s.spawn(|| -> Result<WorkerReport, SortError> {
                let _guard = AbortOnPanic(&signal);
                thread::sleep(Duration::from_millis(20));
                panic!("worker failed");
            });
            assert!(matches!(join_worker(failing), Err(SortError::WorkerPanicked)));
            peer.join().unwrap();
        });
        assert!(signal.is_aborted());
    }

    #[test]
    fn every_node_runs_exactly_once() {
        let mut rng = fastrand::Rng::with_seed(3);
        for workers in [1, 2, 3, 7, 16] {
            let mut nums: Vec<i32> = (0..5000).map(|_| rng.i32(..)).collect();
            let stats = parallel_sort(&mut nums, workers).unwrap();
            assert_eq!(stats.nodes, 2 * workers - 1);
            assert_eq!(stats.jobs.len(), workers);
            assert_eq!(stats.total_jobs(), stats.nodes);
        }
    }

    #[test]
    fn zero_workers_rejected() {
        let mut nums = vec![2, 1];
        assert!(matches!(parallel_sort(&mut nums, 0), Err(SortError::NoWorkers)));
        assert_eq!(nums, [2, 1]);
    }
}
