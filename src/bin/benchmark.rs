use std::time::Instant;

use somnus::run::{self, RunConfig};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    env_logger::init();

    let scenario = scenario_params::get_scenario_params();
    let configs: Vec<RunConfig> = scenario.run_configs().unwrap();

    let wall_start = Instant::now();
    let mut num_steps = 0usize;
    let mut checksum = 0.0;

    for config in &configs {
        let output = run::run_sim(config).unwrap();
        num_steps += output.control.len() + output.altered.len();
        checksum += output.control.h.iter().sum::<f64>() + output.altered.c_rxe.iter().sum::<f64>();

        let control_counts = output.control_hypnogram().unwrap().counts();
        let altered_counts = output.altered_hypnogram().unwrap().counts();
        eprintln!(
            "{} ({}): NREM/REM/Wake ctrl {}/{}/{}, altered {}/{}/{}",
            config.condition_label,
            config.alteration_label(),
            control_counts.nrem,
            control_counts.rem,
            control_counts.wake,
            altered_counts.nrem,
            altered_counts.rem,
            altered_counts.wake
        );
    }

    let wall_time = wall_start.elapsed();
    let step_throughput = num_steps as f64 / wall_time.as_secs_f64();

    eprintln!(
        "Integration throughput: {:.3e} steps/s ({:.3} ns per step)",
        step_throughput,
        1e9 / step_throughput
    );
    eprintln!("Checksum: {}", checksum);
}
