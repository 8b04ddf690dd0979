use crate::params::{PopulationParams, TransmitterParams};

/// Steady-state firing rate for a summed synaptic drive.
///
/// `max_rate / 2 * (1 + tanh((drive - threshold) / alpha))`, which is smooth,
/// monotonically increasing and bounded to `[0, max_rate]` for every real drive.
pub fn sigmoid(drive: f64, max_rate: f64, alpha: f64, threshold: f64) -> f64 {
    0.5 * max_rate * (1.0 + ((drive - threshold) / alpha).tanh())
}

pub fn steady_state_rate(drive: f64, params: &PopulationParams, threshold: f64) -> f64 {
    sigmoid(drive, params.max_rate, params.alpha, threshold)
}

/// Steady-state transmitter concentration released at the given source rate.
pub fn steady_state_concentration(rate: f64, params: &TransmitterParams) -> f64 {
    (rate / params.gamma).tanh()
}
