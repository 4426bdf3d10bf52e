//! The driving loop: a synthetic clock pushing one [`Mlfq`] around.

use std::fmt::{self, Display};

use log::{debug, info, log_enabled, Level};

use crate::config::SchedulerConfig;
use crate::entropy::{Entropy, SeededEntropy};
use crate::error::SchedResult;
use crate::queues::AgingOutcome;
use crate::scheduler::{Admission, Interrupt, Pid, Scheduler};
use crate::schedulers::{Mlfq, SchedulerStats};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The admission budget was used up.
    Budget,
    /// The configured tick limit was reached first.
    TickLimit,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Budget => f.write_str("process budget reached"),
            StopReason::TickLimit => f.write_str("tick limit reached"),
        }
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub pc: Option<u32>,
    pub interrupt: Option<Interrupt>,
    pub wrapped: bool,
    pub terminated: Option<Pid>,
    pub aging: Option<AgingOutcome>,
    pub admission: Option<Admission>,
}

/// Totals for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub requested: usize,
    pub stop: StopReason,
    pub stats: SchedulerStats,
    /// Records still alive when the loop stopped.
    pub live: usize,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run ended after {} ticks: {}", self.ticks, self.stop)?;
        writeln!(
            f,
            "processes: {} requested, {} admitted, {} failed",
            self.requested, self.stats.admitted, self.stats.creation_failures
        )?;
        writeln!(
            f,
            "interrupts: {} timer, {} I/O trap, {} I/O completion",
            self.stats.timer_interrupts, self.stats.io_traps, self.stats.io_completions
        )?;
        writeln!(f, "dispatches: {}", self.stats.dispatches)?;
        writeln!(
            f,
            "terminated: {}, reclaimed: {}, still alive: {}",
            self.stats.terminated, self.stats.reclaimed, self.live
        )?;
        write!(f, "aging resets: {}", self.stats.aging_resets)
    }
}

pub struct Simulation<E: Entropy> {
    engine: Mlfq,
    entropy: E,
    tick: u64,
    requested: usize,
    started: bool,
}

impl Simulation<SeededEntropy> {
    /// A run whose every random draw comes from `seed`.
    pub fn seeded(config: SchedulerConfig, seed: u64) -> SchedResult<Simulation<SeededEntropy>> {
        Ok(Simulation::new(Mlfq::new(config)?, SeededEntropy::seeded(seed)))
    }
}

impl<E: Entropy> Simulation<E> {
    pub fn new(engine: Mlfq, entropy: E) -> Simulation<E> {
        Simulation { engine, entropy, tick: 0, requested: 0, started: false }
    }

    pub fn engine(&self) -> &Mlfq {
        &self.engine
    }

    pub fn entropy(&self) -> &E {
        &self.entropy
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Processes asked for so far, including failed creations.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Run the initial admission. Called by the first `tick` if needed.
    pub fn start(&mut self) -> Admission {
        self.started = true;
        let admission = self.engine.admit(&mut self.entropy);
        self.requested += admission.requested;
        self.log_state();
        admission
    }

    /// Advance the clock by one tick.
    pub fn tick(&mut self) -> SchedResult<TickReport> {
        if !self.started {
            self.start();
        }
        self.tick += 1;
        self.engine.set_clock(self.tick);
        let mut report = TickReport { tick: self.tick, ..TickReport::default() };

        self.engine.dispatch_if_idle();
        report.pc = self.engine.advance();

        if let Some(interrupt) = self.engine.poll_interrupt() {
            debug!("tick {}: {} interrupt", self.tick, interrupt);
            self.engine.interrupt(interrupt, &mut self.entropy)?;
            report.interrupt = Some(interrupt);
            self.log_state();
        }

        report.wrapped = self.engine.wrap_running();
        report.terminated = self.engine.terminate();

        if self.tick % self.engine.config().aging_interval == 0 {
            info!("tick {}: resetting the MLFQ", self.tick);
            report.aging = Some(self.engine.age());
            let chance = self.engine.config().readmission_percent;
            if chance > 0 && self.entropy.percent(chance) {
                let admission = self.engine.admit(&mut self.entropy);
                self.requested += admission.requested;
                report.admission = Some(admission);
            }
            self.log_state();
        }

        Ok(report)
    }

    /// The reason to stop, once there is one.
    pub fn finished(&self) -> Option<StopReason> {
        let config = self.engine.config();
        if self.requested >= config.process_budget {
            return Some(StopReason::Budget);
        }
        match config.tick_limit {
            Some(limit) if self.tick >= limit => Some(StopReason::TickLimit),
            _ => None,
        }
    }

    /// Tick until the budget or the tick limit is reached.
    pub fn run(&mut self) -> SchedResult<RunSummary> {
        if !self.started {
            self.start();
        }
        let stop = loop {
            if let Some(stop) = self.finished() {
                break stop;
            }
            self.tick()?;
        };
        info!("{} after {} ticks", stop, self.tick);

        Ok(RunSummary {
            ticks: self.tick,
            requested: self.requested,
            stop,
            stats: self.engine.stats(),
            live: self.engine.live(),
        })
    }

    fn log_state(&self) {
        if log_enabled!(Level::Debug) {
            debug!("\n{}", self.engine.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ScriptedEntropy;

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_quanta(&[2, 4])
            .with_max_pc(5..=5)
            .with_termination_passes(1..=1)
            .with_trap_count(0)
            .with_aging_interval(100)
    }

    #[test]
    fn start_admits_first_batch() {
        // batch of 1, privilege draw misses
        let mut sim = Simulation::new(Mlfq::new(config()).unwrap(), ScriptedEntropy::new([1, 1]));
        let admission = sim.start();
        assert_eq!(admission, Admission { requested: 1, admitted: 1 });
        assert_eq!(sim.requested(), 1);
        assert_eq!(sim.engine().running(), Some(Pid::new(1)));
    }

    #[test]
    fn timer_then_termination() {
        let mut sim = Simulation::new(Mlfq::new(config()).unwrap(), ScriptedEntropy::new([1, 1]));
        let reports: Vec<TickReport> = (0..5).map(|_| sim.tick().unwrap()).collect();

        assert_eq!(reports[2].interrupt, Some(Interrupt::Timer));
        assert_eq!(reports.iter().filter(|r| r.interrupt.is_some()).count(), 1);
        assert!(reports[4].wrapped);
        assert_eq!(reports[4].terminated, Some(Pid::new(1)));
        assert_eq!(sim.engine().killed().peek(), Some(Pid::new(1)));
    }

    #[test]
    fn tick_limit_stops_run() {
        // empty first batch and no readmission: nothing ever runs
        let config = config().with_tick_limit(25).with_readmission_percent(0);
        let mut sim = Simulation::new(Mlfq::new(config).unwrap(), ScriptedEntropy::constant(50));
        let summary = sim.run().unwrap();
        assert_eq!(summary.stop, StopReason::TickLimit);
        assert_eq!(summary.ticks, 25);
        assert_eq!(summary.requested, 0);
    }

    #[test]
    fn zero_readmission_never_admits() {
        // every draw is 0, which would win any non-zero lottery
        let config = config().with_aging_interval(2).with_readmission_percent(0).with_tick_limit(20);
        let mut sim = Simulation::new(Mlfq::new(config).unwrap(), ScriptedEntropy::constant(0));
        let summary = sim.run().unwrap();
        assert_eq!(summary.stop, StopReason::TickLimit);
        assert_eq!(summary.stats.aging_resets, 10);
        assert_eq!(summary.requested, 0);
    }

    #[test]
    fn aging_happens_on_interval() {
        let config = config().with_aging_interval(3).with_readmission_percent(0);
        // batch of 2, both privilege draws miss, readmission draw misses
        let entropy = ScriptedEntropy::new([2, 1, 1]).with_fallback(99);
        let mut sim = Simulation::new(Mlfq::new(config).unwrap(), entropy);
        let reports: Vec<TickReport> = (0..3).map(|_| sim.tick().unwrap()).collect();
        // pid 1 was demoted by the timer on tick 3, pid 2 took over
        assert_eq!(reports[2].interrupt, Some(Interrupt::Timer));
        assert_eq!(sim.engine().running(), Some(Pid::new(2)));
        assert!(reports[..2].iter().all(|r| r.aging.is_none()));
        assert_eq!(reports[2].aging, Some(AgingOutcome { promoted: 1, drained: false }));
        assert_eq!(reports[2].admission, None);
        assert_eq!(sim.engine().stats().aging_resets, 1);
    }
}
