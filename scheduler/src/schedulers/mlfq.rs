use std::collections::BTreeMap;

use heapless::Vec as BoundedVec;
use log::{debug, info, trace, warn};

use crate::config::{SchedulerConfig, MAX_PRIVILEGED};
use crate::entropy::Entropy;
use crate::error::{SchedError, SchedResult};
use crate::pcb::{ProcessControlBlock, ProcessProfile};
use crate::queues::{AgingOutcome, FifoQueue, PriorityLadder};
use crate::report::{LevelView, ProcessView, SchedulerSnapshot};
use crate::scheduler::{
	Admission, CpuSlot, Interrupt, Pid, Process, ProcessState, Scheduler,
};

/// Counters kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
	pub admitted: usize,
	pub creation_failures: usize,
	pub timer_interrupts: usize,
	pub io_traps: usize,
	pub io_completions: usize,
	pub dispatches: usize,
	pub terminated: usize,
	pub reclaimed: usize,
	pub aging_resets: usize,
}

/// Multi-level feedback queue scheduler.
///
/// Owns every process record. Queues and the cpu slot only hold pids, so a
/// record has exactly one owner and destruction is keyed by pid.
pub struct Mlfq {
	config: SchedulerConfig,
	records: BTreeMap<Pid, ProcessControlBlock>,
	next_pid: usize,
	created: FifoQueue,
	ready: PriorityLadder,
	blocked: FifoQueue,
	killed: FifoQueue,
	slot: CpuSlot,
	first_admission: bool,
	privileged: BoundedVec<Pid, MAX_PRIVILEGED>,
	quantum: usize,
	quantum_tick: usize,
	io_timer: u32,
	clock: u64,
	stats: SchedulerStats,
}

impl Mlfq {
	pub fn new(config: SchedulerConfig) -> SchedResult<Mlfq> {
		config.validate()?;
		let ready = PriorityLadder::new(&config.quanta);
		let quantum = ready.quantum_for(0).get();

		Ok(Mlfq {
			config,
			records: BTreeMap::new(),
			next_pid: 1,
			created: FifoQueue::new(),
			ready,
			blocked: FifoQueue::new(),
			killed: FifoQueue::new(),
			slot: CpuSlot::Empty,
			first_admission: true,
			privileged: BoundedVec::new(),
			quantum,
			quantum_tick: 0,
			io_timer: 0,
			clock: 0,
			stats: SchedulerStats::default(),
		})
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.config
	}

	pub fn stats(&self) -> SchedulerStats {
		self.stats
	}

	pub fn slot(&self) -> CpuSlot {
		self.slot
	}

	/// The pid holding the cpu, if it is actually running.
	pub fn running(&self) -> Option<Pid> {
		match self.slot {
			CpuSlot::Running(pid) => Some(pid),
			_ => None,
		}
	}

	pub fn record(&self, pid: Pid) -> Option<&ProcessControlBlock> {
		self.records.get(&pid)
	}

	/// Number of live records, whatever queue they sit in.
	pub fn live(&self) -> usize {
		self.records.len()
	}

	pub fn ladder(&self) -> &PriorityLadder {
		&self.ready
	}

	pub fn created(&self) -> &FifoQueue {
		&self.created
	}

	pub fn blocked(&self) -> &FifoQueue {
		&self.blocked
	}

	pub fn killed(&self) -> &FifoQueue {
		&self.killed
	}

	pub fn privileged(&self) -> &[Pid] {
		&self.privileged
	}

	pub fn is_privileged(&self, pid: Pid) -> bool {
		self.privileged.contains(&pid)
	}

	/// Quantum of the level the running process was dispatched from.
	pub fn quantum(&self) -> usize {
		self.quantum
	}

	pub fn quantum_tick(&self) -> usize {
		self.quantum_tick
	}

	/// Whether the next non-empty admission seeds the cpu slot.
	pub fn awaiting_first_admission(&self) -> bool {
		self.first_admission
	}

	/// Current simulated time, stamped on new records.
	pub fn set_clock(&mut self, tick: u64) {
		self.clock = tick;
	}

	fn record_mut(&mut self, pid: Pid) -> &mut ProcessControlBlock {
		self.records
			.get_mut(&pid)
			.unwrap_or_else(|| panic!("pid {} has no process record", pid))
	}

	/// Create a record in state `New` and park it in the created queue.
	pub fn create(&mut self, profile: ProcessProfile) -> SchedResult<Pid> {
		if self.records.len() >= self.config.max_records {
			return Err(SchedError::AllocationFailure);
		}
		let pid = Pid::new(self.next_pid);
		self.next_pid += 1;

		let parent = self.slot.pid();
		let pcb = ProcessControlBlock::new(pid, parent, profile, self.ready.levels(), self.clock);
		self.records.insert(pid, pcb);
		self.created.enqueue(pid);
		Ok(pid)
	}

	/// Add `pid` to the privileged table.
	pub fn grant_privilege(&mut self, pid: Pid) -> SchedResult<()> {
		self.privileged
			.push(pid)
			.map_err(|_| SchedError::CapacityExceeded {
				what: "privileged table",
				capacity: MAX_PRIVILEGED,
			})
	}

	/// Move everything in the created queue into the ladder. The first
	/// release after start (or after aging drained the ladder) also seeds
	/// the cpu slot.
	pub fn release_created(&mut self) -> SchedResult<usize> {
		let mut released = 0;
		while let Ok(pid) = self.created.dequeue() {
			let record = self.record_mut(pid);
			record.assign_state(ProcessState::Ready);
			let level = record.priority();
			self.ready.enqueue(pid, level)?;
			debug!("pid {} ready at level {}", pid, level);
			released += 1;
		}

		if released > 0 && self.first_admission {
			self.first_admission = false;
			if let Some(pid) = self.dispatch_if_idle() {
				info!("first admission, pid {} takes the cpu", pid);
			}
		}
		Ok(released)
	}

	/// Admit one process with a known profile.
	pub fn spawn(&mut self, profile: ProcessProfile) -> SchedResult<Pid> {
		let pid = self.create(profile)?;
		self.stats.admitted += 1;
		self.release_created()?;
		Ok(pid)
	}

	/// Hand the cpu to the head of the ladder.
	///
	/// # Panics
	///
	/// If the cpu slot is occupied: some earlier transition forgot to
	/// requeue or retire the previous holder.
	pub fn dispatch(&mut self) -> Option<Pid> {
		assert!(self.slot.is_empty(), "dispatch while the cpu slot holds {:?}", self.slot);

		let (level, pid) = self.ready.peek()?;
		if self.records.get(&pid).map_or(true, |r| r.state() == ProcessState::Halted) {
			warn!("pid {} at the head of level {} is halted, not dispatching", pid, level);
			return None;
		}
		let (level, pid) = self.ready.dequeue().ok()?;

		self.quantum = self.ready.quantum_for(level).get();
		self.quantum_tick = 0;
		self.record_mut(pid).assign_state(ProcessState::Running);
		self.slot = CpuSlot::Running(pid);
		self.stats.dispatches += 1;
		debug!("dispatched pid {} from level {} with quantum {}", pid, level, self.quantum);
		Some(pid)
	}

	pub fn dispatch_if_idle(&mut self) -> Option<Pid> {
		if self.slot.is_empty() {
			self.dispatch()
		} else {
			None
		}
	}

	/// Execute one instruction of the running process. Returns its new PC.
	pub fn advance(&mut self) -> Option<u32> {
		let pid = self.running()?;
		let record = self.records.get_mut(&pid)?;
		record.step();
		trace!("pid {} at pc {}", pid, record.pc());
		Some(record.pc())
	}

	/// Decide which interrupt, if any, fires this tick. Checked in the order
	/// timer, I/O trap, I/O completion; at most one fires.
	///
	/// A trap that matches on a tick the timer wins is latched on the record
	/// and raised the next time the record runs. The blocked head's wait
	/// grows every tick whichever class fires; a completion that is due while
	/// another class wins stays due for the next tick.
	pub fn poll_interrupt(&mut self) -> Option<Interrupt> {
		let completion_due = self.blocked_wait_elapsed();

		if let Some(pid) = self.running() {
			if self.quantum_tick >= self.quantum {
				self.quantum_tick = 0;
				let record = self.record_mut(pid);
				if let Some(device) = record.trap_device() {
					debug!("pid {} trap on device {:?} deferred by the timer", pid, device);
					record.latch_trap(device);
				}
				return Some(Interrupt::Timer);
			}
			self.quantum_tick += 1;

			let record = self.record_mut(pid);
			if record.has_latched_trap() || record.trap_device().is_some() {
				return Some(Interrupt::IoTrap);
			}
		}

		if !completion_due {
			return None;
		}
		self.io_timer = 0;
		Some(Interrupt::IoCompletion)
	}

	/// One tick of waiting for the blocked head. Returns whether its wait is
	/// over.
	fn blocked_wait_elapsed(&mut self) -> bool {
		let Some(head) = self.blocked.peek() else {
			return false;
		};
		let wait = self.records.get(&head).map_or(0, |r| r.blocked_timer());
		if self.io_timer >= wait {
			return true;
		}
		self.io_timer += 1;
		false
	}

	/// Wrap the running process back to PC 0 once it hits its bound,
	/// counting a pass.
	pub fn wrap_running(&mut self) -> bool {
		let Some(pid) = self.running() else {
			return false;
		};
		let record = self.record_mut(pid);
		if !record.wrap_if_done() {
			return false;
		}
		debug!("pid {} wrapped, pass {}/{}", pid, record.term_count(), record.term_threshold());
		true
	}

	/// Destroy every record in the killed queue.
	pub fn reclaim(&mut self) -> Vec<Pid> {
		let doomed: Vec<Pid> = self.killed.drain().collect();
		for pid in &doomed {
			assert_ne!(self.slot.pid(), Some(*pid), "reclaiming pid {} while it holds the cpu", pid);
			self.privileged.retain(|p| p != pid);
			let destroyed = self.records.remove(pid);
			debug_assert!(destroyed.is_some(), "pid {} destroyed twice", pid);
		}
		self.stats.reclaimed += doomed.len();
		if !doomed.is_empty() {
			info!("reclaimed {} halted processes", doomed.len());
		}
		doomed
	}

	fn reclaim_if_due(&mut self) {
		if self.killed.len() >= self.config.reclaim_threshold {
			self.reclaim();
		}
	}

	/// Running -> Interrupted, unless the record is already halted.
	fn pseudo_isr(&mut self) {
		if let CpuSlot::Running(pid) = self.slot {
			let record = self.record_mut(pid);
			if record.state() != ProcessState::Halted {
				record.assign_state(ProcessState::Interrupted);
				self.slot = CpuSlot::Interrupted(pid);
			}
		}
	}

	/// Interrupted -> Running, for the same record.
	fn resume_interrupted(&mut self) {
		if let CpuSlot::Interrupted(pid) = self.slot {
			self.record_mut(pid).assign_state(ProcessState::Running);
			self.slot = CpuSlot::Running(pid);
		}
	}

	fn on_timer(&mut self) -> SchedResult<()> {
		let CpuSlot::Interrupted(pid) = self.slot else {
			return Ok(());
		};

		let record = self.record_mut(pid);
		record.assign_state(ProcessState::Ready);
		// one level down per expiry; the bottom level wraps back to the top
		let level = record.demote();
		self.ready.enqueue(pid, level)?;
		self.slot = CpuSlot::Empty;
		if self.is_privileged(pid) {
			info!("privileged pid {} preempted, requeued at level {}", pid, level);
		} else {
			debug!("pid {} preempted, requeued at level {}", pid, level);
		}
		Ok(())
	}

	fn on_io_trap(&mut self, entropy: &mut dyn Entropy) -> SchedResult<()> {
		let CpuSlot::Interrupted(pid) = self.slot else {
			warn!("I/O trap with no process on the cpu");
			return Ok(());
		};

		let ticks = entropy.between(*self.config.blocked_ticks.start(), *self.config.blocked_ticks.end());
		let record = self.record_mut(pid);
		let latched = record.take_latched_trap();
		let device = latched.or(record.trap_device());
		record.channel_no = device.map_or(0, |d| d as u8);
		record.set_blocked_timer(ticks);
		record.assign_state(ProcessState::Waiting);
		debug!("pid {} blocked on device {:?} for {} ticks at pc {}", pid, device, ticks, record.pc());

		self.blocked.enqueue(pid);
		self.slot = CpuSlot::Empty;
		Ok(())
	}

	fn on_io_completion(&mut self) -> SchedResult<()> {
		let pid = self.blocked.dequeue()?;
		let record = self.record_mut(pid);
		record.assign_state(ProcessState::Ready);
		let level = record.priority();
		self.ready.enqueue(pid, level)?;
		debug!("pid {} I/O done, back at level {}", pid, level);

		match self.slot {
			CpuSlot::Interrupted(_) => self.resume_interrupted(),
			CpuSlot::Empty => {
				self.dispatch();
			}
			CpuSlot::Running(_) => {}
		}
		Ok(())
	}

	fn view(&self, pid: Pid) -> Option<ProcessView> {
		self.records.get(&pid).map(|r| ProcessView::of(r, self.is_privileged(pid)))
	}
}

impl Scheduler for Mlfq {
	/// Draw a batch size in `0..max_batch`, create that many records and
	/// release them into the ladder. A failed creation is skipped, the rest
	/// of the batch goes ahead.
	fn admit(&mut self, entropy: &mut dyn Entropy) -> Admission {
		let requested = entropy.below(self.config.max_batch) as usize;
		let mut admitted = 0;

		for _ in 0..requested {
			let profile = ProcessProfile::random(&self.config, entropy);
			match self.create(profile) {
				Ok(pid) => {
					admitted += 1;
					if !self.privileged.is_full()
						&& entropy.one_in(self.config.privilege_odds)
						&& self.grant_privilege(pid).is_ok()
					{
						info!("pid {} is privileged", pid);
					}
				}
				Err(err) => {
					self.stats.creation_failures += 1;
					warn!("admission: {}, skipping one process", err);
				}
			}
		}
		self.stats.admitted += admitted;

		if let Err(err) = self.release_created() {
			warn!("admission: {}", err);
		}
		if requested > 0 {
			info!("admitted {} of {} new processes", admitted, requested);
		}
		Admission { requested, admitted }
	}

	fn interrupt(&mut self, interrupt: Interrupt, entropy: &mut dyn Entropy) -> SchedResult<()> {
		debug!("servicing {} interrupt", interrupt);
		self.pseudo_isr();

		let outcome = match interrupt {
			Interrupt::Timer => {
				self.stats.timer_interrupts += 1;
				self.on_timer()
			}
			Interrupt::IoTrap => {
				self.stats.io_traps += 1;
				self.on_io_trap(entropy)
			}
			Interrupt::IoCompletion => {
				self.stats.io_completions += 1;
				self.on_io_completion()
			}
		};
		if outcome.is_err() {
			self.resume_interrupted();
			return outcome;
		}

		self.reclaim_if_due();
		// an I/O completion resumes the interrupted process directly
		if interrupt != Interrupt::IoCompletion {
			self.dispatch_if_idle();
		}
		Ok(())
	}

	fn terminate(&mut self) -> Option<Pid> {
		let pid = self.running()?;
		let record = self.record_mut(pid);
		if !record.passes_done() {
			return None;
		}
		record.assign_state(ProcessState::Halted);
		info!("pid {} halted after {} passes", pid, record.term_count());

		self.slot = CpuSlot::Empty;
		self.killed.enqueue(pid);
		self.stats.terminated += 1;
		self.reclaim_if_due();
		self.dispatch_if_idle();
		Some(pid)
	}

	fn age(&mut self) -> AgingOutcome {
		let records = &mut self.records;
		let outcome = self.ready.age(|pid| {
			if let Some(record) = records.get_mut(&pid) {
				record.assign_priority(0);
			}
		});
		self.stats.aging_resets += 1;
		if outcome.drained {
			self.first_admission = true;
		}
		info!("aging reset moved {} processes to level 0", outcome.promoted);
		outcome
	}

	fn list(&self) -> Vec<&dyn Process> {
		self.records.values().map(|record| record as &dyn Process).collect()
	}

	fn snapshot(&self) -> SchedulerSnapshot {
		let levels = self
			.ready
			.iter()
			.enumerate()
			.map(|(level, rung)| LevelView {
				level,
				quantum: rung.quantum().get(),
				members: rung.queue().iter().filter_map(|pid| self.view(pid)).collect(),
			})
			.collect();

		SchedulerSnapshot {
			levels,
			running: self.slot.pid().and_then(|pid| self.view(pid)),
			next_up: self.ready.peek().and_then(|(_, pid)| self.view(pid)),
			blocked: self.blocked.len(),
			killed: self.killed.len(),
			privileged: self.privileged.iter().filter_map(|pid| self.view(*pid)).collect(),
			quantum: self.quantum,
			quantum_tick: self.quantum_tick,
		}
	}
}
