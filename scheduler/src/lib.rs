//! A multi-level feedback queue scheduler simulator.
//!
//! This library provides the process records, the queues and the scheduler
//! engine, plus a driving loop that runs the engine on a synthetic clock.
//!

mod scheduler;

pub use crate::scheduler::{Admission, CpuSlot, Interrupt, Pid, Process, ProcessState, Scheduler};

pub mod config;
pub mod entropy;
pub mod error;
pub mod logger;
pub mod pcb;
pub mod queues;
pub mod report;

mod schedulers;

pub use crate::config::SchedulerConfig;
pub use crate::error::{SchedError, SchedResult};
pub use crate::schedulers::{Mlfq, SchedulerStats};

mod simulation;

pub use crate::simulation::{RunSummary, Simulation, StopReason, TickReport};

/// Returns a structure that implements the `Scheduler` trait with a multi-level feedback queue policy
///
/// * `config` - the priority ladder (one quantum per level, level 0 first)
///              and the admission, aging and reclamation parameters. The
///              configuration is validated first and an invalid one is
///              returned as [`SchedError::InvalidConfig`].
pub fn mlfq(config: SchedulerConfig) -> SchedResult<Mlfq> {
    Mlfq::new(config)
}
