//! Arena-backed binary task tree.
//!
//! `[0, len)` is cut into `jobs` contiguous leaves whose sizes differ by at
//! most one (the first `len % jobs` leaves take the extra element). Levels are
//! then paired left to right into merge nodes; an odd node out is carried up to
//! the next level unchanged, until a single root remains.

use std::fmt;
use std::ops::Range;

use tracing::{debug, trace};

use crate::error::SortError;
use crate::node::{Job, NodeId, WorkNode};

pub struct WorkTree {
    nodes: Vec<WorkNode>,
    root: NodeId,
    leaves: usize,
}

impl WorkTree {
    pub fn build(len: usize, jobs: usize) -> Result<Self, SortError> {
        if jobs == 0 {
            return Err(SortError::NoWorkers);
        }
        let total = jobs.saturating_mul(2) - 1;
        let mut nodes = try_with_capacity("task tree", total)?;

        let base = len / jobs;
        let larger = len % jobs;
        let mut low = 0;
        for i in 0..jobs {
            let size = if i < larger { base + 1 } else { base };
            nodes.push(WorkNode::leaf(low, low + size));
            low += size;
        }
        debug_assert_eq!(low, len);

        let mut level = try_with_capacity("task tree level", jobs)?;
        level.extend((0..jobs).map(NodeId));
        let mut next = try_with_capacity("task tree level", jobs.div_ceil(2))?;
        while level.len() > 1 {
            for pair in level.chunks(2) {
                match pair {
                    &[left, right] => {
                        let branch =
                            WorkNode::branch(left, &nodes[left.0], right, &nodes[right.0]);
                        next.push(NodeId(nodes.len()));
                        nodes.push(branch);
                    }
                    &[odd] => next.push(odd),
                    _ => unreachable!(),
                }
            }
            std::mem::swap(&mut level, &mut next);
            next.clear();
        }

        let tree = Self {
            root: level[0],
            nodes,
            leaves: jobs,
        };
        debug!(
            len,
            leaves = tree.leaves,
            nodes = tree.node_count(),
            depth = tree.depth(),
            "built task tree"
        );
        trace!("task tree:\n{tree}");
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &WorkNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[WorkNode] {
        &self.nodes
    }

    /// Always `2 * jobs - 1`; a tree has at least its root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_complete(&self) -> bool {
        self.node(self.root).is_done()
    }

    /// Leaf ranges in left-to-right order.
    pub fn leaf_ranges(&self) -> Vec<Range<usize>> {
        self.nodes[..self.leaves].iter().map(WorkNode::range).collect()
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.depth_from(self.root)
    }

    fn depth_from(&self, id: NodeId) -> usize {
        match self.node(id).children() {
            None => 0,
            Some((left, right)) => 1 + self.depth_from(left).max(self.depth_from(right)),
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let node = self.node(id);
        write!(f, "{:indent$}", "", indent = indent * 2)?;
        match node.job() {
            Job::Sort => writeln!(f, "[{}, {}) sort", node.low(), node.high())?,
            Job::Merge { mid } => writeln!(f, "[{}, {}, {}) merge", node.low(), mid, node.high())?,
        }
        if let Some((left, right)) = node.children() {
            self.fmt_node(f, left, indent + 1)?;
            self.fmt_node(f, right, indent + 1)?;
        }
        Ok(())
    }
}

fn try_with_capacity<T>(what: &'static str, len: usize) -> Result<Vec<T>, SortError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| SortError::Alloc { what, len, source })?;
    Ok(buf)
}

impl fmt::Display for WorkTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)
    }
}
