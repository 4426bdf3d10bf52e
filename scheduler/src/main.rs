use std::process::ExitCode;

use log::{error, info};

use mlfq::entropy::SeededEntropy;
use mlfq::{logger, Simulation, SchedulerConfig};

fn main() -> ExitCode {
    if let Err(err) = logger::init(logger::level_from_env()) {
        eprintln!("logger: {}", err);
    }

    let entropy = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(seed) => SeededEntropy::seeded(seed),
            Err(_) => {
                eprintln!("usage: mlfq-sim [seed]");
                return ExitCode::FAILURE;
            }
        },
        None => SeededEntropy::from_random_seed(),
    };
    info!("seed {}", entropy.seed());

    let engine = match mlfq::mlfq(SchedulerConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            error!("bad configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match Simulation::new(engine, entropy).run() {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("simulation stopped: {}", err);
            ExitCode::FAILURE
        }
    }
}
