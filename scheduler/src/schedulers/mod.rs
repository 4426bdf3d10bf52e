//! Scheduling policies.
//!
//! Each policy lives in its own file and is exported here.

mod mlfq;
pub use mlfq::{Mlfq, SchedulerStats};
