//! Holding areas for process ids: the plain FIFO queue used for the
//! created, blocked and killed queues, and the priority ladder built from it.

mod fifo;
pub use fifo::FifoQueue;

mod ladder;
pub use ladder::{AgingOutcome, Level, PriorityLadder};
