//! Parallel merge sort over a shared binary task tree.
//!
//! [`parallel_sort`] splits the input into one contiguous leaf per worker and
//! builds a tree of merges above them. A fixed pool of threads then scans that
//! tree, claims whichever node has its prerequisites met, and executes it in
//! place on the shared slice: leaves get a bottom-up merge sort, branches a
//! single two-way merge of their already sorted children.

mod check;
mod error;
mod merge;
mod node;
mod scheduler;
mod shared;
mod tree;

pub use check::{is_sorted, same_multiset};
pub use error::SortError;
pub use merge::{merge, sequential_sort, sort_run};
pub use node::{Job, NodeId, NodeState, WorkNode};
pub use scheduler::{ScheduleStats, WakeSignal, parallel_sort};
pub use tree::WorkTree;
