use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{try_with, SimpleError};

use crate::{
    error::SimResult,
    hypnogram::Hypnogram,
    integrator,
    model::SleepRegulationModel,
    params::{
        self, Alteration, IntegrationParams, SimulationParams, SynapticWeights, WeightSet,
    },
    result::SimulationResult,
};

/// One simulation number of one experimental condition. The control and the
/// altered run are both derived from the single `params` record, so they share
/// the initial state, the time grid and every weight except the altered one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub condition_label: String,
    pub simulation_number: usize,
    pub alteration: Option<Alteration>,
    pub params: SimulationParams,
}

impl RunConfig {
    pub fn control_weights(&self) -> WeightSet {
        WeightSet::control(self.params.weights)
    }

    pub fn altered_weights(&self) -> WeightSet {
        WeightSet::altered(self.params.weights, self.alteration)
    }

    pub fn alteration_label(&self) -> &'static str {
        params::alteration_label(self.alteration.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub condition_label: String,
    pub simulation_number: usize,
    pub alteration: Option<Alteration>,
    pub integration: IntegrationParams,
    pub control_weights: SynapticWeights,
    pub altered_weights: SynapticWeights,
    pub control: SimulationResult,
    pub altered: SimulationResult,
}

impl RunOutput {
    pub fn alteration_label(&self) -> &'static str {
        params::alteration_label(self.alteration.as_ref())
    }

    pub fn control_hypnogram(&self) -> SimResult<Hypnogram> {
        self.control.hypnogram()
    }

    pub fn altered_hypnogram(&self) -> SimResult<Hypnogram> {
        self.altered.hypnogram()
    }
}

pub fn validate_run_config(config: &RunConfig) -> Result<(), SimpleError> {
    if config.condition_label.is_empty() {
        return Err(SimpleError::new("condition_label must not be empty"));
    }

    if config
        .condition_label
        .contains(|c: char| std::path::is_separator(c) || c == '.')
    {
        return Err(SimpleError::new(format!(
            "condition_label must not contain path separators or dots: {}",
            config.condition_label
        )));
    }

    if let Some(alteration) = &config.alteration {
        if !alteration.value.is_finite() {
            return Err(SimpleError::new(format!(
                "altered value for {} must be finite",
                alteration.synapse
            )));
        }
    }

    params::validate_simulation_params(&config.params)
}

pub fn run_sim(config: &RunConfig) -> SimResult<RunOutput> {
    try_with!(validate_run_config(config), "invalid run configuration");

    info!(
        "running {} sim {} ({} vs ctrl, {} h)",
        config.condition_label,
        config.simulation_number,
        config.alteration_label(),
        config.params.integration.duration_hours
    );

    let control_weights = config.control_weights();
    let altered_weights = config.altered_weights();

    let control = simulate(config, control_weights)?;
    let altered = simulate(config, altered_weights)?;

    info!(
        "finished {} sim {} ({} samples per run)",
        config.condition_label,
        config.simulation_number,
        control.len()
    );

    Ok(RunOutput {
        condition_label: config.condition_label.clone(),
        simulation_number: config.simulation_number,
        alteration: config.alteration,
        integration: config.params.integration,
        control_weights: control_weights.effective(),
        altered_weights: altered_weights.effective(),
        control,
        altered,
    })
}

fn simulate(config: &RunConfig, weights: WeightSet) -> SimResult<SimulationResult> {
    let model = SleepRegulationModel::new(config.params.model.clone(), weights);
    integrator::integrate(
        &model,
        &config.params.initial_state,
        &config.params.integration,
    )
}

/// Builds a run from the six weights as handed over by a driver script.
///
/// `weights` holds the altered value at `alteration_site`. The control run uses
/// the same weights with that synapse restored to its default value.
pub fn config_from_weights(
    params: &SimulationParams,
    simulation_number: usize,
    alteration_site: &str,
    condition_label: &str,
    weights: SynapticWeights,
) -> SimResult<RunConfig> {
    let synapse = params::parse_alteration_site(alteration_site)?;

    let (baseline, alteration) = match synapse {
        Some(synapse) => (
            weights.with(synapse, SynapticWeights::default().get(synapse)),
            Some(Alteration {
                synapse,
                value: weights.get(synapse),
            }),
        ),
        None => (weights, None),
    };

    Ok(RunConfig {
        condition_label: condition_label.to_string(),
        simulation_number,
        alteration,
        params: SimulationParams {
            weights: baseline,
            ..params.clone()
        },
    })
}

pub fn config_from_invocation(
    duration_hours: f64,
    simulation_number: usize,
    alteration_site: &str,
    condition_label: &str,
    weights: SynapticWeights,
) -> SimResult<RunConfig> {
    let mut params = SimulationParams::default();
    params.integration.duration_hours = duration_hours;

    config_from_weights(
        &params,
        simulation_number,
        alteration_site,
        condition_label,
        weights,
    )
}

pub fn run_sim_from_invocation(
    duration_hours: f64,
    simulation_number: usize,
    alteration_site: &str,
    condition_label: &str,
    weights: SynapticWeights,
) -> SimResult<RunOutput> {
    let config = config_from_invocation(
        duration_hours,
        simulation_number,
        alteration_site,
        condition_label,
        weights,
    )?;

    run_sim(&config)
}
