use std::num::NonZeroUsize;

use log::debug;

use crate::error::{SchedError, SchedResult};
use crate::queues::FifoQueue;
use crate::scheduler::Pid;

/// One rung of the ladder.
#[derive(Debug, Clone)]
pub struct Level {
    queue: FifoQueue,
    quantum: NonZeroUsize,
}

impl Level {
    pub fn queue(&self) -> &FifoQueue {
        &self.queue
    }

    pub fn quantum(&self) -> NonZeroUsize {
        self.quantum
    }
}

/// Result of an aging pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgingOutcome {
    /// Records moved up to level 0.
    pub promoted: usize,
    /// The ladder is empty after the pass.
    pub drained: bool,
}

/// The ready structure: one FIFO queue per priority level, level 0 first.
///
/// Selection is strict priority between levels and FIFO inside a level.
#[derive(Debug, Clone)]
pub struct PriorityLadder {
    levels: Vec<Level>,
}

impl PriorityLadder {
    pub fn new(quanta: &[NonZeroUsize]) -> PriorityLadder {
        PriorityLadder {
            levels: quanta
                .iter()
                .map(|quantum| Level { queue: FifoQueue::new(), quantum: *quantum })
                .collect(),
        }
    }

    /// Number of priority levels.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> Option<&Level> {
        self.levels.get(level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    /// Insert at the tail of the queue for `priority`.
    pub fn enqueue(&mut self, pid: Pid, priority: usize) -> SchedResult<()> {
        let max = self.levels.len();
        let level = self
            .levels
            .get_mut(priority)
            .ok_or(SchedError::InvalidPriority { requested: priority, max })?;
        level.queue.enqueue(pid);
        Ok(())
    }

    /// Head of the highest-priority non-empty level, with that level.
    pub fn peek(&self) -> Option<(usize, Pid)> {
        self.levels
            .iter()
            .enumerate()
            .find_map(|(index, level)| level.queue.peek().map(|pid| (index, pid)))
    }

    pub fn dequeue(&mut self) -> SchedResult<(usize, Pid)> {
        let level = self
            .levels
            .iter()
            .position(|level| !level.queue.is_empty())
            .ok_or(SchedError::EmptyQueue)?;
        let pid = self.levels[level].queue.dequeue()?;
        Ok((level, pid))
    }

    /// The quantum configured for `level`. Levels past the bottom use the
    /// bottom quantum.
    pub fn quantum_for(&self, level: usize) -> NonZeroUsize {
        let last = self.levels.len().saturating_sub(1);
        self.levels
            .get(level.min(last))
            .map(|level| level.quantum)
            .unwrap_or(NonZeroUsize::MIN)
    }

    /// The quantum the next dispatched record will get.
    pub fn next_quantum(&self) -> Option<NonZeroUsize> {
        self.peek().map(|(level, _)| self.quantum_for(level))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|level| level.queue.is_empty())
    }

    /// Records across all levels.
    pub fn len(&self) -> usize {
        self.levels.iter().map(|level| level.queue.len()).sum()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.levels.iter().any(|level| level.queue.contains(pid))
    }

    /// Splice every lower level onto the tail of level 0, in level order.
    ///
    /// `promote` is called once for every record that moves so its owner can
    /// reset the stored priority.
    pub fn age<F: FnMut(Pid)>(&mut self, mut promote: F) -> AgingOutcome {
        let mut promoted = 0;
        if let Some((top, rest)) = self.levels.split_first_mut() {
            for (offset, level) in rest.iter_mut().enumerate() {
                if level.queue.is_empty() {
                    continue;
                }
                debug!("aging: {} records from level {} to level 0", level.queue.len(), offset + 1);
                level.queue.iter().for_each(&mut promote);
                promoted += level.queue.len();
                top.queue.splice(&mut level.queue);
            }
        }
        AgingOutcome { promoted, drained: self.is_empty() }
    }
}
