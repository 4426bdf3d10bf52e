use std::collections::BTreeSet;

use mlfq::{
    CpuSlot, Mlfq, Pid, Process, ProcessState, Scheduler, SchedulerConfig, Simulation, StopReason,
};

/// Every pid sits in exactly one place, every place points at a live record
/// in the matching state, and ladder levels agree with stored priorities.
fn check_consistency(engine: &Mlfq) {
    let live: BTreeSet<Pid> = engine.list().iter().map(|process| process.pid()).collect();
    let mut seen = BTreeSet::new();

    for (level, rung) in engine.ladder().iter().enumerate() {
        for pid in rung.queue().iter() {
            let record = engine.record(pid).expect("ladder holds a destroyed record");
            assert_eq!(record.state(), ProcessState::Ready, "pid {} in the ladder", pid);
            assert_eq!(record.priority(), level, "pid {} on the wrong level", pid);
            assert!(seen.insert(pid), "pid {} queued twice", pid);
        }
    }
    for pid in engine.blocked().iter() {
        let record = engine.record(pid).expect("blocked queue holds a destroyed record");
        assert_eq!(record.state(), ProcessState::Waiting);
        assert!(seen.insert(pid), "pid {} queued twice", pid);
    }
    for pid in engine.killed().iter() {
        let record = engine.record(pid).expect("killed queue holds a destroyed record");
        assert_eq!(record.state(), ProcessState::Halted);
        assert!(seen.insert(pid), "pid {} queued twice", pid);
    }
    match engine.slot() {
        CpuSlot::Running(pid) => {
            let record = engine.record(pid).expect("cpu slot holds a destroyed record");
            assert_eq!(record.state(), ProcessState::Running);
            assert!(seen.insert(pid), "running pid {} is also queued", pid);
        }
        CpuSlot::Interrupted(pid) => panic!("pid {} left mid-interrupt", pid),
        CpuSlot::Empty => assert!(engine.ladder().is_empty()),
    }
    for pid in engine.privileged() {
        assert!(live.contains(pid), "privileged slot holds destroyed pid {}", pid);
    }

    assert!(engine.created().is_empty());
    assert_eq!(seen, live);
}

#[test]
fn runs_end_on_budget() {
    for seed in [1, 7, 42, 1234, 99_999] {
        let mut sim = Simulation::seeded(SchedulerConfig::default(), seed).unwrap();
        let summary = sim.run().unwrap();

        assert_eq!(summary.stop, StopReason::Budget, "seed {}", seed);
        assert!(summary.requested >= 30);
        assert_eq!(summary.stats.admitted + summary.stats.creation_failures, summary.requested);
        assert_eq!(summary.stats.terminated, summary.stats.reclaimed + sim.engine().killed().len());
        assert_eq!(summary.live, sim.engine().live());
        check_consistency(sim.engine());
    }
}

#[test]
fn every_tick_is_consistent() {
    let config = SchedulerConfig::default()
        .with_quanta(&[1, 2, 3])
        .with_max_pc(5..=15)
        .with_reclaim_threshold(2)
        .with_blocked_ticks(0..=4)
        .with_readmission_percent(50)
        .with_max_records(12)
        .with_tick_limit(3000);
    let mut sim = Simulation::seeded(config, 2024).unwrap();
    sim.start();

    while sim.finished().is_none() {
        sim.tick().unwrap();
        check_consistency(sim.engine());
        assert!(sim.engine().live() <= 12);
    }
    assert!(sim.engine().stats().dispatches > 0);
}

#[test]
fn same_seed_same_run() {
    let config = SchedulerConfig::default().with_tick_limit(5000);
    let first = Simulation::seeded(config.clone(), 31337).unwrap().run().unwrap();
    let second = Simulation::seeded(config, 31337).unwrap().run().unwrap();
    assert_eq!(first, second);
}

#[test]
fn never_terminating_processes_are_never_killed() {
    let config = SchedulerConfig::default()
        .with_termination_passes(0..=0)
        .with_max_pc(5..=10)
        .with_tick_limit(2000);
    let summary = Simulation::seeded(config, 5).unwrap().run().unwrap();
    assert_eq!(summary.stats.terminated, 0);
    assert_eq!(summary.stats.reclaimed, 0);
}
