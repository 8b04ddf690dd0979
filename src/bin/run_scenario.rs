use std::path::Path;
use std::process::ExitCode;

use log::{error, info};
use somnus::scenario::{self, Scenario};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() -> ExitCode {
    env_logger::init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => match Scenario::from_file(Path::new(&path)) {
            Ok(scenario) => scenario,
            Err(err) => {
                error!("cannot load scenario {}: {}", path, err);
                return ExitCode::FAILURE;
            }
        },
        None => scenario_params::get_scenario_params(),
    };

    let persisted = match scenario::run_scenario(&scenario) {
        Ok(persisted) => persisted,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut num_failed = 0;

    for result in persisted {
        match result {
            Ok(run) => println!(
                "{}\n{}",
                run.control_dir.display(),
                run.altered_dir.display()
            ),
            Err(err) => {
                error!("{}", err);
                num_failed += 1;
            }
        }
    }

    if num_failed > 0 {
        error!("{} runs failed", num_failed);
        return ExitCode::FAILURE;
    }

    info!("results written to {}", scenario.output_dir.display());
    ExitCode::SUCCESS
}
