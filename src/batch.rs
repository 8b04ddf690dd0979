use core_affinity::CoreId;
use itertools::Itertools;
use log::{info, warn};
use simple_error::{try_with, SimpleError};
use std::thread;

use crate::{
    error::SimResult,
    params::{self, TechnicalParams},
    run::{self, RunConfig, RunOutput},
    types::{HashMap, HashSet},
    util,
};

/// Runs are independent and share no state, so they are split into contiguous
/// chunks and dispatched one chunk per worker thread. Results come back in
/// input order; a failing run does not abort the others.
pub fn run_batch(
    configs: &[RunConfig],
    technical_params: &TechnicalParams,
) -> SimResult<Vec<SimResult<RunOutput>>> {
    try_with!(
        params::validate_technical_params(technical_params),
        "invalid technical parameters"
    );
    validate_batch(configs)?;

    if configs.is_empty() {
        return Ok(Vec::new());
    }

    let num_threads = get_num_threads(technical_params).min(configs.len());
    info!(
        "dispatching {} runs over {} threads",
        configs.len(),
        num_threads
    );

    let chunk_results = thread::scope(|scope| {
        let join_handles = (0..num_threads)
            .map(|thread_id| {
                let chunk = &configs[util::get_partition_range(num_threads, thread_id, configs.len())];
                let pin_threads = technical_params.pin_threads;

                scope.spawn(move || {
                    if pin_threads {
                        core_affinity::set_for_current(CoreId { id: thread_id });
                    }

                    chunk.iter().map(run::run_sim).collect_vec()
                })
            })
            .collect_vec();

        join_handles
            .into_iter()
            .map(|join_handle| {
                join_handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect_vec()
    });

    let results = chunk_results.into_iter().flatten().collect_vec();

    for (config, result) in configs.iter().zip(&results) {
        if let Err(err) = result {
            warn!(
                "{} sim {} ({}) failed: {}",
                config.condition_label,
                config.simulation_number,
                config.alteration_label(),
                err
            );
        }
    }

    Ok(results)
}

fn get_num_threads(technical_params: &TechnicalParams) -> usize {
    technical_params
        .num_threads
        .unwrap_or_else(|| num_cpus::get())
}

/// Rejects runs that would persist to the same location. Every run also writes
/// its control result below the `ctrl` site of its condition, so runs sharing a
/// condition, duration and simulation number must share identical baseline
/// parameters; that control directory is then written once.
pub fn validate_batch(configs: &[RunConfig]) -> Result<(), SimpleError> {
    let mut seen_keys = HashSet::default();
    let mut control_params = HashMap::default();

    for config in configs {
        let duration_bits = config.params.integration.duration_hours.to_bits();
        let key = (
            config.condition_label.as_str(),
            config.alteration_label(),
            duration_bits,
            config.simulation_number,
        );

        if !seen_keys.insert(key) {
            return Err(SimpleError::new(format!(
                "duplicate run: {} {} sim {}",
                config.condition_label,
                config.alteration_label(),
                config.simulation_number
            )));
        }

        let control_key = (
            config.condition_label.as_str(),
            duration_bits,
            config.simulation_number,
        );

        if let Some(earlier) = control_params.insert(control_key, &config.params) {
            if *earlier != config.params {
                return Err(SimpleError::new(format!(
                    "conflicting control run: {} {} sim {} differs from an earlier run in its baseline parameters",
                    config.condition_label,
                    params::CONTROL_SITE,
                    config.simulation_number
                )));
            }
        }
    }

    Ok(())
}
