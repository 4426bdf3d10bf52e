//! Read-only copies of the scheduler state and their text rendering.
//!
//! The engine fills a [`SchedulerSnapshot`]; nothing here reaches back into
//! it, so printing can never disturb scheduling.

use std::fmt::{self, Display};

use crate::pcb::{CpuContext, ProcessControlBlock};
use crate::scheduler::{Pid, Process, ProcessState};

/// What a report shows of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessView {
    pub pid: Pid,
    pub state: ProcessState,
    pub priority: usize,
    pub pc: u32,
    pub parent: Option<Pid>,
    pub privileged: bool,
}

impl ProcessView {
    pub fn of(process: &dyn Process, privileged: bool) -> ProcessView {
        ProcessView {
            pid: process.pid(),
            state: process.state(),
            priority: process.priority(),
            pc: process.pc(),
            parent: process.parent(),
            privileged,
        }
    }
}

/// One level of the ladder, head first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelView {
    pub level: usize,
    pub quantum: usize,
    pub members: Vec<ProcessView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub levels: Vec<LevelView>,
    /// The record in the cpu slot, running or mid-interrupt.
    pub running: Option<ProcessView>,
    /// The record the next dispatch would pick.
    pub next_up: Option<ProcessView>,
    pub blocked: usize,
    pub killed: usize,
    pub privileged: Vec<ProcessView>,
    pub quantum: usize,
    pub quantum_tick: usize,
}

impl SchedulerSnapshot {
    /// Records waiting in the ladder.
    pub fn ready(&self) -> usize {
        self.levels.iter().map(|level| level.members.len()).sum()
    }
}

impl Display for ProcessView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID: {}, state: {}, priority: {}, PC: 0x{:04X}",
            self.pid, self.state, self.priority, self.pc
        )
    }
}

impl Display for LevelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}: ", self.level)?;
        for member in &self.members {
            write!(f, "P{}->", member.pid)?;
        }
        f.write_str("*")
    }
}

impl Display for SchedulerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MLFQ State")?;
        for level in self.levels.iter().filter(|level| !level.members.is_empty()) {
            writeln!(f, "{} (quantum {})", level, level.quantum)?;
        }
        writeln!(f)?;

        for view in &self.privileged {
            writeln!(f, "PCB PID {}, PRIORITY {}, PC {}", view.pid, view.priority, view.pc)?;
        }
        writeln!(f, "blocked size: {}", self.blocked)?;
        writeln!(f, "killed size: {}", self.killed)?;
        writeln!(f)?;

        match &self.running {
            Some(view) => writeln!(
                f,
                "Going to be running contents: {} (tick {}/{})",
                view, self.quantum_tick, self.quantum
            )?,
            None => writeln!(f, "Going to be running")?,
        }
        match &self.next_up {
            Some(view) => writeln!(f, "Next highest priority PCB contents: {}", view),
            None => writeln!(f, "Next highest priority PCB contents: The MLFQ is empty!"),
        }
    }
}

impl Display for CpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ir: {}, psr: {}", self.ir, self.psr)?;
        for (index, reg) in self.regs.iter().enumerate() {
            write!(f, ", r{}: {}", index, reg)?;
        }
        Ok(())
    }
}

impl Display for ProcessControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ProcessView::of(self, false))?;
        if f.alternate() {
            match self.parent() {
                Some(parent) => write!(f, ", parent: {}", parent)?,
                None => f.write_str(", parent: none")?,
            }
            write!(f, ", size: {}, channel_no: {}", self.size, self.channel_no)?;
            write!(f, ", created: tick {}, {}", self.created_at(), self.extra())?;
            let (io_1, io_2) = self.io_traps();
            write!(
                f,
                "\n traps: io1 {:?}, io2 {:?}",
                io_1.iter().collect::<Vec<_>>(),
                io_2.iter().collect::<Vec<_>>()
            )?;
            write!(f, "\n CPU context values: {}", self.context)?;
        }
        Ok(())
    }
}
