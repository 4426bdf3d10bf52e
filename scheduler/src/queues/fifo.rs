use std::collections::LinkedList;

use crate::error::{SchedError, SchedResult};
use crate::scheduler::Pid;

/// First-in first-out queue of process ids.
///
/// Backed by a linked list so whole queues can be spliced onto each other
/// without touching their members.
#[derive(Debug, Clone, Default)]
pub struct FifoQueue {
    nodes: LinkedList<Pid>,
    size: usize,
}

impl FifoQueue {
    pub fn new() -> FifoQueue {
        FifoQueue::default()
    }

    pub fn enqueue(&mut self, pid: Pid) {
        self.nodes.push_back(pid);
        self.size += 1;
    }

    pub fn dequeue(&mut self) -> SchedResult<Pid> {
        let pid = self.nodes.pop_front().ok_or(SchedError::EmptyQueue)?;
        self.size -= 1;
        Ok(pid)
    }

    pub fn peek(&self) -> Option<Pid> {
        self.nodes.front().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.nodes.contains(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.nodes.iter().copied()
    }

    /// Move every member of `other` onto the tail of this queue in O(1),
    /// leaving `other` empty.
    pub fn splice(&mut self, other: &mut FifoQueue) {
        self.size += other.size;
        self.nodes.append(&mut other.nodes);
        other.size = 0;
    }

    /// Empty the queue, yielding members in order.
    pub fn drain(&mut self) -> impl Iterator<Item = Pid> {
        self.size = 0;
        std::mem::take(&mut self.nodes).into_iter()
    }
}
