//! Common vocabulary shared by the scheduler engine, its queues and the
//! driving loop.

use std::fmt::{self, Display};

use crate::entropy::Entropy;
use crate::error::SchedResult;
use crate::queues::AgingOutcome;
use crate::report::SchedulerSnapshot;

/// Process identifier. Assigned monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(usize);

impl Pid {
    pub fn new(pid: usize) -> Pid {
        Pid(pid)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<usize> for Pid {
    fn eq(&self, other: &usize) -> bool {
        self.0 == *other
    }
}

/// The lifecycle states of a process record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Created, sitting in the created queue.
    New,
    /// Waiting in the priority ladder.
    Ready,
    /// Owns the CPU.
    Running,
    /// Preempted, in the middle of a transition.
    Interrupted,
    /// Blocked on synthetic I/O.
    Waiting,
    /// Finished for good; only reclamation remains.
    Halted,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::New => "new",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Interrupted => "interrupted",
            ProcessState::Waiting => "waiting",
            ProcessState::Halted => "halted",
        }
    }
}

impl Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three interrupt classes, in the order the driving loop checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// The running process used up its quantum.
    Timer,
    /// The running process hit one of its I/O trap values.
    IoTrap,
    /// The head of the blocked queue finished waiting.
    IoCompletion,
}

impl Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Timer => f.write_str("timer"),
            Interrupt::IoTrap => f.write_str("I/O trap"),
            Interrupt::IoCompletion => f.write_str("I/O completion"),
        }
    }
}

/// Read-only view over a process record.
pub trait Process {
    fn pid(&self) -> Pid;
    fn state(&self) -> ProcessState;
    /// Priority level, 0 is the highest.
    fn priority(&self) -> usize;
    fn parent(&self) -> Option<Pid>;
    fn pc(&self) -> u32;
    /// Free-form extra information, used when printing.
    fn extra(&self) -> String;
}

/// What the running slot holds.
///
/// The running and interrupted views are mutually exclusive: a record is
/// either running or mid-transition, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuSlot {
    #[default]
    Empty,
    Running(Pid),
    Interrupted(Pid),
}

impl CpuSlot {
    pub fn pid(&self) -> Option<Pid> {
        match self {
            CpuSlot::Empty => None,
            CpuSlot::Running(pid) | CpuSlot::Interrupted(pid) => Some(*pid),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CpuSlot::Empty)
    }
}

/// Outcome of one admission round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Admission {
    /// Batch size drawn for the round.
    pub requested: usize,
    /// Records actually created and made ready.
    pub admitted: usize,
}

/// The operations a driving loop uses to push a scheduler around.
pub trait Scheduler {
    /// Create a random batch of new processes and move them into the ready
    /// structure.
    fn admit(&mut self, entropy: &mut dyn Entropy) -> Admission;

    /// Service one interrupt of the given class.
    fn interrupt(&mut self, interrupt: Interrupt, entropy: &mut dyn Entropy) -> SchedResult<()>;

    /// Halt and retire the running process if it has done all of its passes.
    /// Returns the retired pid.
    fn terminate(&mut self) -> Option<Pid>;

    /// Fold every lower level of the ready structure back into the top one.
    fn age(&mut self) -> AgingOutcome;

    /// Every live record, sorted by pid.
    fn list(&self) -> Vec<&dyn Process>;

    /// A copy of the scheduler state for reporting.
    fn snapshot(&self) -> SchedulerSnapshot;
}
