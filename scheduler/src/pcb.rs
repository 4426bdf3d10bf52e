//! Process control blocks.

use heapless::FnvIndexSet;
use log::warn;

use crate::config::{SchedulerConfig, MAX_TRAPS};
use crate::entropy::Entropy;
use crate::error::{SchedError, SchedResult};
use crate::scheduler::{Pid, Process, ProcessState};

/// A bounded set of program counter values that raise an I/O trap.
pub type TrapSet = FnvIndexSet<u32, MAX_TRAPS>;

/// CPU register file, named after the LC-3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuContext {
    pub pc: u32,
    pub ir: u32,
    pub psr: u32,
    pub regs: [u32; 8],
}

/// The two synthetic I/O devices a process can trap into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDevice {
    First = 1,
    Second = 2,
}

/// The per-process parameters that are normally drawn at random.
#[derive(Debug, Clone)]
pub struct ProcessProfile {
    pub max_pc: u32,
    /// Passes through the program before the process halts. Zero never halts.
    pub term_threshold: u32,
    pub io_1_traps: TrapSet,
    pub io_2_traps: TrapSet,
}

impl ProcessProfile {
    pub fn new(max_pc: u32, term_threshold: u32) -> ProcessProfile {
        ProcessProfile {
            max_pc,
            term_threshold,
            io_1_traps: TrapSet::new(),
            io_2_traps: TrapSet::new(),
        }
    }

    pub fn with_trap(mut self, device: IoDevice, pc: u32) -> SchedResult<ProcessProfile> {
        let set = match device {
            IoDevice::First => &mut self.io_1_traps,
            IoDevice::Second => &mut self.io_2_traps,
        };
        set.insert(pc)
            .map_err(|_| SchedError::CapacityExceeded { what: "trap set", capacity: MAX_TRAPS })?;
        Ok(self)
    }

    /// Draw a profile from the configured ranges. Trap values fall inside
    /// `1..max_pc`; duplicate draws collapse.
    pub fn random(config: &SchedulerConfig, entropy: &mut dyn Entropy) -> ProcessProfile {
        let max_pc = entropy.between(*config.max_pc.start(), *config.max_pc.end());
        let term_threshold = entropy.between(
            *config.termination_passes.start(),
            *config.termination_passes.end(),
        );
        let mut profile = ProcessProfile::new(max_pc, term_threshold);
        let count = config.trap_count.min(MAX_TRAPS);
        for set in [&mut profile.io_1_traps, &mut profile.io_2_traps] {
            for _ in 0..count {
                let pc = entropy.between(1, max_pc.saturating_sub(1).max(1));
                // never full: at most MAX_TRAPS insertions
                let _ = set.insert(pc);
            }
        }
        profile
    }
}

/// Process control block.
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pid: Pid,
    state: ProcessState,
    parent: Option<Pid>,
    priority: usize,
    levels: usize,
    pub context: CpuContext,
    pub size: u32,
    pub channel_no: u8,
    max_pc: u32,
    term_threshold: u32,
    term_count: u32,
    blocked_timer: u32,
    io_1_traps: TrapSet,
    io_2_traps: TrapSet,
    latched_trap: Option<IoDevice>,
    created_at: u64,
}

impl ProcessControlBlock {
    /// A fresh record in state `New` at the top priority level.
    pub fn new(
        pid: Pid,
        parent: Option<Pid>,
        profile: ProcessProfile,
        levels: usize,
        created_at: u64,
    ) -> ProcessControlBlock {
        ProcessControlBlock {
            pid,
            state: ProcessState::New,
            parent,
            priority: 0,
            levels: levels.max(1),
            context: CpuContext::default(),
            size: profile.max_pc,
            channel_no: 0,
            max_pc: profile.max_pc.max(1),
            term_threshold: profile.term_threshold,
            term_count: 0,
            blocked_timer: 0,
            io_1_traps: profile.io_1_traps,
            io_2_traps: profile.io_2_traps,
            latched_trap: None,
            created_at,
        }
    }

    pub fn assign_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    /// Set the priority, clamping anything out of range to the lowest level.
    /// Returns the priority actually stored.
    pub fn assign_priority(&mut self, priority: usize) -> usize {
        match self.try_priority(priority) {
            Ok(()) => {}
            Err(err) => {
                warn!("pid {}: {}, clamped to {}", self.pid, err, self.levels - 1);
                self.priority = self.levels - 1;
            }
        }
        self.priority
    }

    /// Set the priority, refusing out of range values.
    pub fn try_priority(&mut self, priority: usize) -> SchedResult<()> {
        if priority >= self.levels {
            return Err(SchedError::InvalidPriority { requested: priority, max: self.levels });
        }
        self.priority = priority;
        Ok(())
    }

    /// Move one level down, wrapping back to the top past the lowest level.
    pub fn demote(&mut self) -> usize {
        let next = if self.priority + 1 < self.levels { self.priority + 1 } else { 0 };
        self.assign_priority(next)
    }

    /// Execute one instruction.
    pub fn step(&mut self) {
        self.context.pc = self.context.pc.wrapping_add(1);
        self.context.ir = self.context.pc;
    }

    /// Loop back to the start of the program once the PC reaches its bound,
    /// counting a completed pass. Returns `true` if it wrapped.
    pub fn wrap_if_done(&mut self) -> bool {
        if self.context.pc < self.max_pc {
            return false;
        }
        self.context.pc = 0;
        self.term_count += 1;
        true
    }

    /// The device whose trap set holds the current PC.
    pub fn trap_device(&self) -> Option<IoDevice> {
        let pc = self.context.pc;
        if self.io_1_traps.contains(&pc) {
            Some(IoDevice::First)
        } else if self.io_2_traps.contains(&pc) {
            Some(IoDevice::Second)
        } else {
            None
        }
    }

    /// Remember a trap that matched while another interrupt had the tick.
    pub fn latch_trap(&mut self, device: IoDevice) {
        self.latched_trap = Some(device);
    }

    /// Consume a latched trap.
    pub fn take_latched_trap(&mut self) -> Option<IoDevice> {
        self.latched_trap.take()
    }

    pub fn has_latched_trap(&self) -> bool {
        self.latched_trap.is_some()
    }

    /// All passes are done and the process should halt.
    pub fn passes_done(&self) -> bool {
        self.term_threshold > 0 && self.term_count == self.term_threshold
    }

    pub fn set_blocked_timer(&mut self, ticks: u32) {
        self.blocked_timer = ticks;
    }

    pub fn blocked_timer(&self) -> u32 {
        self.blocked_timer
    }

    pub fn max_pc(&self) -> u32 {
        self.max_pc
    }

    pub fn term_threshold(&self) -> u32 {
        self.term_threshold
    }

    pub fn term_count(&self) -> u32 {
        self.term_count
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn io_traps(&self) -> (&TrapSet, &TrapSet) {
        (&self.io_1_traps, &self.io_2_traps)
    }
}

impl Process for ProcessControlBlock {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn state(&self) -> ProcessState {
        self.state
    }

    fn priority(&self) -> usize {
        self.priority
    }

    fn parent(&self) -> Option<Pid> {
        self.parent
    }

    fn pc(&self) -> u32 {
        self.context.pc
    }

    fn extra(&self) -> String {
        format!("pass {}/{}", self.term_count, self.term_threshold)
    }
}
