use mlfq::entropy::ScriptedEntropy;
use mlfq::pcb::{IoDevice, ProcessProfile};
use mlfq::{CpuSlot, Interrupt, Mlfq, Pid, Process, ProcessState, SchedulerConfig, Simulation};

fn config(quanta: &[usize]) -> SchedulerConfig {
    SchedulerConfig::default()
        .with_quanta(quanta)
        .with_trap_count(0)
        .with_blocked_ticks(2..=2)
        .with_aging_interval(1000)
}

/// A simulation around an engine that already holds `profiles`. The scripted
/// source answers 0, so the initial admission batch is empty.
fn simulation(config: SchedulerConfig, profiles: Vec<ProcessProfile>) -> Simulation<ScriptedEntropy> {
    let mut engine = Mlfq::new(config).unwrap();
    for profile in profiles {
        engine.spawn(profile).unwrap();
    }
    Simulation::new(engine, ScriptedEntropy::default())
}

#[test]
fn single_process_halts_after_one_pass() {
    let mut sim = simulation(config(&[2, 4]), vec![ProcessProfile::new(5, 1)]);
    let pid = Pid::new(1);

    let mut interrupts = Vec::new();
    for _ in 0..4 {
        let report = sim.tick().unwrap();
        interrupts.extend(report.interrupt);
        assert_eq!(report.terminated, None);
    }
    // one quantum expiry at level 0, then the process runs on at level 1
    assert_eq!(interrupts, vec![Interrupt::Timer]);
    assert_eq!(sim.engine().record(pid).unwrap().priority(), 1);
    assert_eq!(sim.engine().quantum(), 4);

    let report = sim.tick().unwrap();
    assert!(report.wrapped);
    assert_eq!(report.terminated, Some(pid));

    let record = sim.engine().record(pid).unwrap();
    assert_eq!(record.state(), ProcessState::Halted);
    assert_eq!(record.term_count(), 1);
    assert_eq!(sim.engine().killed().iter().collect::<Vec<_>>(), vec![pid]);
    assert_eq!(sim.engine().slot(), CpuSlot::Empty);

    // halted for good: more ticks never move it again
    for _ in 0..10 {
        assert_eq!(sim.tick().unwrap().terminated, None);
    }
    assert_eq!(sim.engine().killed().len(), 1);
    assert_eq!(sim.engine().stats().terminated, 1);
}

#[test]
fn process_without_threshold_never_halts() {
    let mut sim = simulation(config(&[2, 4]), vec![ProcessProfile::new(3, 0)]);
    for _ in 0..100 {
        assert_eq!(sim.tick().unwrap().terminated, None);
    }
    assert!(sim.engine().killed().is_empty());
    assert!(sim.engine().record(Pid::new(1)).unwrap().term_count() > 10);
}

#[test]
fn trap_at_pc_three_blocks() {
    let profile = ProcessProfile::new(20, 0).with_trap(IoDevice::First, 3).unwrap();
    let mut sim = simulation(config(&[50, 100]), vec![profile]);
    let pid = Pid::new(1);

    assert_eq!(sim.tick().unwrap().interrupt, None);
    assert_eq!(sim.tick().unwrap().interrupt, None);
    let report = sim.tick().unwrap();
    assert_eq!(report.pc, Some(3));
    assert_eq!(report.interrupt, Some(Interrupt::IoTrap));

    let record = sim.engine().record(pid).unwrap();
    assert_eq!(record.state(), ProcessState::Waiting);
    assert_eq!(record.blocked_timer(), 2);
    assert_eq!(record.channel_no, 1);
    assert_eq!(sim.engine().blocked().peek(), Some(pid));
    assert_eq!(sim.engine().slot(), CpuSlot::Empty);
}

#[test]
fn trap_deferred_by_timer_is_not_lost() {
    let profile = ProcessProfile::new(20, 0).with_trap(IoDevice::Second, 3).unwrap();
    let mut sim = simulation(config(&[2, 4]), vec![profile]);
    let pid = Pid::new(1);

    let reports: Vec<_> = (0..4).map(|_| sim.tick().unwrap()).collect();
    assert_eq!(reports[2].interrupt, Some(Interrupt::Timer));
    assert_eq!(reports[3].interrupt, Some(Interrupt::IoTrap));

    let record = sim.engine().record(pid).unwrap();
    assert_eq!(record.state(), ProcessState::Waiting);
    assert_eq!(record.channel_no, 2);
    assert!(!record.has_latched_trap());
}

#[test]
fn blocked_process_comes_back() {
    let profile = ProcessProfile::new(20, 0).with_trap(IoDevice::First, 1).unwrap();
    let mut sim = simulation(config(&[50]), vec![profile, ProcessProfile::new(20, 0)]);
    let (first, second) = (Pid::new(1), Pid::new(2));

    assert_eq!(sim.tick().unwrap().interrupt, Some(Interrupt::IoTrap));
    assert_eq!(sim.engine().running(), Some(second));

    // two ticks of waiting, completion on the third
    assert_eq!(sim.tick().unwrap().interrupt, None);
    assert_eq!(sim.tick().unwrap().interrupt, None);
    assert_eq!(sim.tick().unwrap().interrupt, Some(Interrupt::IoCompletion));

    // the interrupted process resumes, the woken one waits its turn
    assert_eq!(sim.engine().running(), Some(second));
    assert_eq!(sim.engine().record(first).unwrap().state(), ProcessState::Ready);
    assert_eq!(sim.engine().ladder().peek(), Some((0, first)));
}

#[test]
fn io_wait_does_not_depend_on_quantum() {
    let completion_tick = |quanta: &[usize]| {
        let profile = ProcessProfile::new(20, 0).with_trap(IoDevice::First, 1).unwrap();
        let mut sim = simulation(config(quanta), vec![profile, ProcessProfile::new(20, 0)]);
        (0..20)
            .map(|_| sim.tick().unwrap())
            .find(|report| report.interrupt == Some(Interrupt::IoCompletion))
            .map(|report| report.tick)
    };

    // a busy cpu preempting every tick wakes the blocked process as soon as
    // an idle one does
    assert_eq!(completion_tick(&[50]), Some(4));
    assert_eq!(completion_tick(&[1]), Some(4));
}

#[test]
fn killed_batch_is_reclaimed() {
    let config = config(&[100]).with_reclaim_threshold(3);
    let profiles = (0..4).map(|_| ProcessProfile::new(2, 1)).collect();
    let mut sim = simulation(config, profiles);

    let mut halted = Vec::new();
    for _ in 0..6 {
        halted.extend(sim.tick().unwrap().terminated);
    }
    assert_eq!(halted, vec![Pid::new(1), Pid::new(2), Pid::new(3)]);
    assert_eq!(sim.engine().live(), 1);
    assert!(sim.engine().killed().is_empty());
    assert!(sim.engine().record(Pid::new(1)).is_none());
    assert_eq!(sim.engine().running(), Some(Pid::new(4)));
    assert_eq!(sim.engine().stats().reclaimed, 3);
}

#[test]
fn snapshot_reports_queues() {
    let mut engine = Mlfq::new(config(&[2, 4])).unwrap();
    for _ in 0..3 {
        engine.spawn(ProcessProfile::new(10, 0)).unwrap();
    }
    engine.grant_privilege(Pid::new(3)).unwrap();

    let snapshot = mlfq::Scheduler::snapshot(&engine);
    assert_eq!(snapshot.running.as_ref().map(|view| view.pid), Some(Pid::new(1)));
    assert_eq!(snapshot.next_up.as_ref().map(|view| view.pid), Some(Pid::new(2)));
    assert_eq!(snapshot.ready(), 2);
    assert_eq!(snapshot.privileged.len(), 1);
    assert!(snapshot.privileged[0].privileged);

    let text = snapshot.to_string();
    assert!(text.contains("Q0: P2->P3->*"));
    assert!(text.contains("Going to be running contents: PID: 1, state: running"));
    assert!(text.contains("Next highest priority PCB contents: PID: 2, state: ready"));
}
