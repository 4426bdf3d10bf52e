//! Tunables for the scheduler engine and the driving loop.

use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

use crate::error::{SchedError, SchedResult};

/// Default number of priority levels.
pub const NUM_PRIORITIES: usize = 16;
/// Quantum growth per level in the default ladder.
pub const QUANTUM_STEP: usize = 5;
/// Capacity of a single trap set.
pub const MAX_TRAPS: usize = 8;
/// Slots in the privileged table.
pub const MAX_PRIVILEGED: usize = 4;

/// Scheduler and simulation configuration.
///
/// Built from [`Default`] and adjusted with the `with_*` methods:
///
/// ```
/// use mlfq::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_quanta(&[2, 4])
///     .with_process_budget(10);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.levels(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub quanta: Vec<NonZeroUsize>,
    pub max_batch: u32,
    pub process_budget: usize,
    pub aging_interval: u64,
    pub reclaim_threshold: usize,
    pub termination_passes: RangeInclusive<u32>,
    pub max_pc: RangeInclusive<u32>,
    pub trap_count: usize,
    pub blocked_ticks: RangeInclusive<u32>,
    pub privilege_odds: u32,
    /// Chance of a new admission batch after each aging reset, drawn as
    /// `below(100) <= percent`, so any non-zero value wins one point more
    /// often than it says. Zero turns readmission off.
    pub readmission_percent: u32,
    pub max_records: usize,
    pub tick_limit: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let quanta = (1..=NUM_PRIORITIES)
            .filter_map(|level| NonZeroUsize::new(level * QUANTUM_STEP))
            .collect();

        SchedulerConfig {
            quanta,
            max_batch: 5,
            process_budget: 30,
            aging_interval: 10,
            reclaim_threshold: 10,
            termination_passes: 1..=3,
            max_pc: 50..=200,
            trap_count: 4,
            blocked_ticks: 0..=2,
            privilege_odds: 7,
            readmission_percent: 10,
            max_records: 64,
            tick_limit: None,
        }
    }
}

impl SchedulerConfig {
    /// Number of priority levels.
    pub fn levels(&self) -> usize {
        self.quanta.len()
    }

    /// Replace the ladder. A zero quantum anywhere leaves the ladder empty,
    /// which `validate` rejects.
    pub fn with_quanta(mut self, quanta: &[usize]) -> Self {
        self.quanta = quanta.iter().filter_map(|q| NonZeroUsize::new(*q)).collect();
        if self.quanta.len() != quanta.len() {
            self.quanta.clear();
        }
        self
    }

    pub fn with_max_batch(mut self, max_batch: u32) -> Self {
        self.max_batch = max_batch;
        self
    }

    pub fn with_process_budget(mut self, budget: usize) -> Self {
        self.process_budget = budget;
        self
    }

    pub fn with_aging_interval(mut self, interval: u64) -> Self {
        self.aging_interval = interval;
        self
    }

    pub fn with_reclaim_threshold(mut self, threshold: usize) -> Self {
        self.reclaim_threshold = threshold;
        self
    }

    pub fn with_termination_passes(mut self, passes: RangeInclusive<u32>) -> Self {
        self.termination_passes = passes;
        self
    }

    pub fn with_max_pc(mut self, max_pc: RangeInclusive<u32>) -> Self {
        self.max_pc = max_pc;
        self
    }

    pub fn with_trap_count(mut self, count: usize) -> Self {
        self.trap_count = count;
        self
    }

    pub fn with_blocked_ticks(mut self, ticks: RangeInclusive<u32>) -> Self {
        self.blocked_ticks = ticks;
        self
    }

    pub fn with_privilege_odds(mut self, odds: u32) -> Self {
        self.privilege_odds = odds;
        self
    }

    pub fn with_readmission_percent(mut self, percent: u32) -> Self {
        self.readmission_percent = percent;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> SchedResult<()> {
        if self.quanta.is_empty() {
            return Err(SchedError::InvalidConfig("at least one non-zero quantum is required"));
        }
        if self.quanta.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(SchedError::InvalidConfig("quanta must not shrink at lower priorities"));
        }
        if self.max_batch < 2 {
            return Err(SchedError::InvalidConfig("admission batch bound must allow one process"));
        }
        if self.aging_interval == 0 {
            return Err(SchedError::InvalidConfig("aging interval must be positive"));
        }
        if self.reclaim_threshold == 0 {
            return Err(SchedError::InvalidConfig("reclamation threshold must be positive"));
        }
        if self.termination_passes.is_empty() {
            return Err(SchedError::InvalidConfig("termination pass range is empty"));
        }
        if self.max_pc.is_empty() || *self.max_pc.start() == 0 {
            return Err(SchedError::InvalidConfig("max PC range must be non-empty and positive"));
        }
        if self.trap_count > MAX_TRAPS {
            return Err(SchedError::CapacityExceeded { what: "trap set", capacity: MAX_TRAPS });
        }
        if self.blocked_ticks.is_empty() {
            return Err(SchedError::InvalidConfig("blocked duration range is empty"));
        }
        if self.privilege_odds == 0 {
            return Err(SchedError::InvalidConfig("privilege odds must be positive"));
        }
        if self.readmission_percent > 100 {
            return Err(SchedError::InvalidConfig("readmission chance is a percentage"));
        }
        if self.max_records == 0 {
            return Err(SchedError::InvalidConfig("process table needs room for one record"));
        }
        Ok(())
    }
}
