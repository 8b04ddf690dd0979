use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::model::SimulationState;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

const GRID_TOLERANCE: f64 = 1e-9;

/// Upper bound on grid points per run; each sample holds eight `f64` series.
pub const MAX_NUM_SAMPLES: usize = 20_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Synapse {
    #[serde(rename = "g_RRe")]
    RRe,
    #[serde(rename = "g_RWe")]
    RWe,
    #[serde(rename = "g_WNi")]
    WNi,
    #[serde(rename = "g_WRi")]
    WRi,
    #[serde(rename = "g_NRi")]
    NRi,
    #[serde(rename = "g_NWi")]
    NWi,
}

impl Synapse {
    pub const ALL: [Synapse; 6] = [
        Synapse::RRe,
        Synapse::RWe,
        Synapse::WNi,
        Synapse::WRi,
        Synapse::NRi,
        Synapse::NWi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Synapse::RRe => "g_RRe",
            Synapse::RWe => "g_RWe",
            Synapse::WNi => "g_WNi",
            Synapse::WRi => "g_WRi",
            Synapse::NRi => "g_NRi",
            Synapse::NWi => "g_NWi",
        }
    }
}

impl fmt::Display for Synapse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Synapse {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Synapse::ALL
            .into_iter()
            .find(|synapse| synapse.name() == s)
            .ok_or_else(|| SimpleError::new(format!("unknown synapse: {}", s)))
    }
}

pub const CONTROL_SITE: &str = "ctrl";

/// Parses an alteration site name. `"ctrl"` means no alteration.
pub fn parse_alteration_site(site: &str) -> Result<Option<Synapse>, SimpleError> {
    if site == CONTROL_SITE {
        return Ok(None);
    }

    site.parse().map(Some).map_err(|_| {
        SimpleError::new(format!(
            "unknown alteration site: {} (expected {} or one of {})",
            site,
            CONTROL_SITE,
            Synapse::ALL.map(|synapse| synapse.name()).join(", ")
        ))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynapticWeights {
    #[serde(rename = "g_RRe")]
    pub g_rre: f64,
    #[serde(rename = "g_RWe")]
    pub g_rwe: f64,
    #[serde(rename = "g_WNi")]
    pub g_wni: f64,
    #[serde(rename = "g_WRi")]
    pub g_wri: f64,
    #[serde(rename = "g_NRi")]
    pub g_nri: f64,
    #[serde(rename = "g_NWi")]
    pub g_nwi: f64,
}

impl SynapticWeights {
    pub fn get(&self, synapse: Synapse) -> f64 {
        match synapse {
            Synapse::RRe => self.g_rre,
            Synapse::RWe => self.g_rwe,
            Synapse::WNi => self.g_wni,
            Synapse::WRi => self.g_wri,
            Synapse::NRi => self.g_nri,
            Synapse::NWi => self.g_nwi,
        }
    }

    pub fn with(&self, synapse: Synapse, value: f64) -> Self {
        let mut result = *self;
        let slot = match synapse {
            Synapse::RRe => &mut result.g_rre,
            Synapse::RWe => &mut result.g_rwe,
            Synapse::WNi => &mut result.g_wni,
            Synapse::WRi => &mut result.g_wri,
            Synapse::NRi => &mut result.g_nri,
            Synapse::NWi => &mut result.g_nwi,
        };
        *slot = value;
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alteration {
    pub synapse: Synapse,
    pub value: f64,
}

/// Baseline weights plus at most one overridden synapse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    pub baseline: SynapticWeights,
    pub alteration: Option<Alteration>,
}

impl WeightSet {
    pub fn control(baseline: SynapticWeights) -> Self {
        Self {
            baseline,
            alteration: None,
        }
    }

    pub fn altered(baseline: SynapticWeights, alteration: Option<Alteration>) -> Self {
        Self {
            baseline,
            alteration,
        }
    }

    pub fn effective(&self) -> SynapticWeights {
        match self.alteration {
            Some(Alteration { synapse, value }) => self.baseline.with(synapse, value),
            None => self.baseline,
        }
    }

    pub fn site_label(&self) -> &'static str {
        alteration_label(self.alteration.as_ref())
    }
}

pub fn alteration_label(alteration: Option<&Alteration>) -> &'static str {
    alteration.map_or(CONTROL_SITE, |alteration| alteration.synapse.name())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationParams {
    pub max_rate: f64,
    pub alpha: f64,
    pub beta: f64,
    pub tau: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransmitterParams {
    pub gamma: f64,
    pub tau: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeostasisParams {
    pub wake_threshold: f64,
    pub tau_wake: f64,
    pub tau_sleep: f64,
    pub nrem_threshold_gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub wake: PopulationParams,
    pub nrem: PopulationParams,
    pub rem: PopulationParams,
    pub wxi: TransmitterParams,
    pub nxi: TransmitterParams,
    pub rxe: TransmitterParams,
    pub homeostasis: HomeostasisParams,
}

impl ModelParams {
    pub fn fastest_time_constant(&self) -> f64 {
        [
            self.wake.tau,
            self.nrem.tau,
            self.rem.tau,
            self.wxi.tau,
            self.nxi.tau,
            self.rxe.tau,
            self.homeostasis.tau_wake,
            self.homeostasis.tau_sleep,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationParams {
    pub duration_hours: f64,
    pub step_size: f64,
}

impl IntegrationParams {
    pub fn duration_seconds(&self) -> f64 {
        self.duration_hours * SECONDS_PER_HOUR
    }

    pub fn num_samples(&self) -> usize {
        (self.duration_seconds() / self.step_size).round() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub model: ModelParams,
    pub weights: SynapticWeights,
    pub integration: IntegrationParams,
    pub initial_state: SimulationState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalParams {
    pub num_threads: Option<usize>,
    pub pin_threads: bool,
}

impl Default for SynapticWeights {
    fn default() -> Self {
        Self {
            g_rre: 1.6,
            g_rwe: 1.0,
            g_wni: -2.0,
            g_wri: -4.0,
            g_nri: -1.3,
            g_nwi: -1.68,
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            wake: PopulationParams {
                max_rate: 6.5,
                alpha: 0.5,
                beta: -0.4,
                tau: 25.0,
            },
            nrem: PopulationParams {
                max_rate: 5.0,
                alpha: 0.175,
                beta: 0.0,
                tau: 10.0,
            },
            rem: PopulationParams {
                max_rate: 5.0,
                alpha: 0.13,
                beta: -0.9,
                tau: 1.0,
            },
            wxi: TransmitterParams {
                gamma: 5.0,
                tau: 25.0,
            },
            nxi: TransmitterParams {
                gamma: 4.0,
                tau: 10.0,
            },
            rxe: TransmitterParams {
                gamma: 2.0,
                tau: 10.0,
            },
            homeostasis: HomeostasisParams {
                wake_threshold: 2.0,
                tau_wake: 34830.0,
                tau_sleep: 30600.0,
                nrem_threshold_gain: 1.5,
            },
        }
    }
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            duration_hours: 16.0,
            step_size: 0.5,
        }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            model: ModelParams::default(),
            weights: SynapticWeights::default(),
            integration: IntegrationParams::default(),
            initial_state: SimulationState::default(),
        }
    }
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            num_threads: None,
            pin_threads: false,
        }
    }
}

pub fn validate_simulation_params(params: &SimulationParams) -> Result<(), SimpleError> {
    validate_model_params(&params.model)?;
    validate_weights(&params.weights)?;
    validate_integration_params(&params.integration, &params.model)?;
    validate_initial_state(&params.initial_state, &params.model)?;

    Ok(())
}

fn validate_model_params(model_params: &ModelParams) -> Result<(), SimpleError> {
    validate_population_params("wake", &model_params.wake)?;
    validate_population_params("nrem", &model_params.nrem)?;
    validate_population_params("rem", &model_params.rem)?;
    validate_transmitter_params("wxi", &model_params.wxi)?;
    validate_transmitter_params("nxi", &model_params.nxi)?;
    validate_transmitter_params("rxe", &model_params.rxe)?;
    validate_homeostasis_params(&model_params.homeostasis)?;

    Ok(())
}

fn validate_population_params(name: &str, params: &PopulationParams) -> Result<(), SimpleError> {
    if params.max_rate <= 0.0 {
        return Err(SimpleError::new(format!(
            "{}: max_rate must be strictly positive",
            name
        )));
    }

    if params.alpha <= 0.0 {
        return Err(SimpleError::new(format!(
            "{}: alpha must be strictly positive",
            name
        )));
    }

    if !params.beta.is_finite() {
        return Err(SimpleError::new(format!("{}: beta must be finite", name)));
    }

    if params.tau <= 0.0 {
        return Err(SimpleError::new(format!(
            "{}: tau must be strictly positive",
            name
        )));
    }

    Ok(())
}

fn validate_transmitter_params(name: &str, params: &TransmitterParams) -> Result<(), SimpleError> {
    if params.gamma <= 0.0 {
        return Err(SimpleError::new(format!(
            "{}: gamma must be strictly positive",
            name
        )));
    }

    if params.tau <= 0.0 {
        return Err(SimpleError::new(format!(
            "{}: tau must be strictly positive",
            name
        )));
    }

    Ok(())
}

fn validate_homeostasis_params(params: &HomeostasisParams) -> Result<(), SimpleError> {
    if params.tau_wake <= 0.0 {
        return Err(SimpleError::new("tau_wake must be strictly positive"));
    }

    if params.tau_sleep <= 0.0 {
        return Err(SimpleError::new("tau_sleep must be strictly positive"));
    }

    if params.wake_threshold < 0.0 {
        return Err(SimpleError::new("wake_threshold must not be negative"));
    }

    Ok(())
}

pub fn validate_weights(weights: &SynapticWeights) -> Result<(), SimpleError> {
    for synapse in Synapse::ALL {
        if !weights.get(synapse).is_finite() {
            return Err(SimpleError::new(format!("{} must be finite", synapse)));
        }
    }

    Ok(())
}

pub fn validate_integration_params(
    integration_params: &IntegrationParams,
    model_params: &ModelParams,
) -> Result<(), SimpleError> {
    if !(integration_params.duration_hours > 0.0) {
        return Err(SimpleError::new("duration_hours must be strictly positive"));
    }

    if !(integration_params.step_size > 0.0) {
        return Err(SimpleError::new("step_size must be strictly positive"));
    }

    if !integration_params.duration_hours.is_finite() {
        return Err(SimpleError::new("duration_hours must be finite"));
    }

    if !integration_params.step_size.is_finite() {
        return Err(SimpleError::new("step_size must be finite"));
    }

    if integration_params.step_size > model_params.fastest_time_constant() {
        return Err(SimpleError::new(format!(
            "step_size must not exceed the fastest time constant ({} s)",
            model_params.fastest_time_constant()
        )));
    }

    let exact_num_samples = integration_params.duration_seconds() / integration_params.step_size;

    if exact_num_samples.round() > MAX_NUM_SAMPLES as f64 {
        return Err(SimpleError::new(format!(
            "number of samples must not exceed {}",
            MAX_NUM_SAMPLES
        )));
    }

    if (exact_num_samples - exact_num_samples.round()).abs() > GRID_TOLERANCE * exact_num_samples
    {
        return Err(SimpleError::new(
            "duration must be a whole multiple of step_size",
        ));
    }

    Ok(())
}

fn validate_initial_state(
    state: &SimulationState,
    model_params: &ModelParams,
) -> Result<(), SimpleError> {
    let rates = [
        ("f_R", state.f_r, model_params.rem.max_rate),
        ("f_N", state.f_n, model_params.nrem.max_rate),
        ("f_W", state.f_w, model_params.wake.max_rate),
    ];

    for (name, rate, max_rate) in rates {
        if !(0.0..=max_rate).contains(&rate) {
            return Err(SimpleError::new(format!(
                "initial {} must be in [0, {}]",
                name, max_rate
            )));
        }
    }

    let unit_values = [
        ("C_NXi", state.c_nxi),
        ("C_WXi", state.c_wxi),
        ("C_RXe", state.c_rxe),
        ("h", state.h),
    ];

    for (name, value) in unit_values {
        if !(0.0..=1.0).contains(&value) {
            return Err(SimpleError::new(format!("initial {} must be in [0, 1]", name)));
        }
    }

    Ok(())
}

pub fn validate_technical_params(technical_params: &TechnicalParams) -> Result<(), SimpleError> {
    if let Some(num_threads) = technical_params.num_threads {
        if num_threads == 0 {
            return Err(SimpleError::new("num_threads must be strictly positive"));
        }

        if num_cpus::get() < num_threads {
            return Err(SimpleError::new(
                "num_threads must not be greater than number of available CPUs",
            ));
        }
    }

    Ok(())
}
