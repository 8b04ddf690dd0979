//! Right-hand side of the Wake/NREM/REM flip-flop model.
//!
//! Each population rate relaxes towards the sigmoid of its net drive, each
//! transmitter concentration relaxes towards `tanh(rate / gamma)` of its source
//! population, and the homeostatic pressure `h` saturates towards 1 while the
//! Wake population is active and decays towards 0 otherwise. The NREM activation
//! threshold is lowered in proportion to `h`, which drives sleep onset.

use serde::{Deserialize, Serialize};

use crate::{
    activation,
    params::{ModelParams, SynapticWeights, WeightSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub f_r: f64,
    pub f_n: f64,
    pub f_w: f64,
    pub c_nxi: f64,
    pub c_wxi: f64,
    pub c_rxe: f64,
    pub h: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            f_r: 0.0,
            f_n: 0.0,
            f_w: 6.0,
            c_nxi: 0.0,
            c_wxi: 0.9,
            c_rxe: 0.0,
            h: 0.5,
        }
    }
}

impl SimulationState {
    /// `self + dt * derivative`
    pub fn advanced(&self, derivative: &SimulationState, dt: f64) -> Self {
        Self {
            f_r: self.f_r + dt * derivative.f_r,
            f_n: self.f_n + dt * derivative.f_n,
            f_w: self.f_w + dt * derivative.f_w,
            c_nxi: self.c_nxi + dt * derivative.c_nxi,
            c_wxi: self.c_wxi + dt * derivative.c_wxi,
            c_rxe: self.c_rxe + dt * derivative.c_rxe,
            h: self.h + dt * derivative.h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drives {
    pub wake: f64,
    pub nrem: f64,
    pub rem: f64,
}

pub fn drives(state: &SimulationState, weights: &SynapticWeights) -> Drives {
    Drives {
        wake: weights.g_nwi * state.c_nxi + weights.g_rwe * state.c_rxe,
        nrem: weights.g_wni * state.c_wxi,
        rem: weights.g_rre * state.c_rxe + weights.g_wri * state.c_wxi + weights.g_nri * state.c_nxi,
    }
}

#[derive(Debug, Clone)]
pub struct SleepRegulationModel {
    params: ModelParams,
    weights: WeightSet,
}

impl SleepRegulationModel {
    pub fn new(params: ModelParams, weights: WeightSet) -> Self {
        Self { params, weights }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn weights(&self) -> &WeightSet {
        &self.weights
    }

    pub fn nrem_threshold(&self, h: f64) -> f64 {
        self.params.nrem.beta - self.params.homeostasis.nrem_threshold_gain * h
    }

    pub fn derivative(&self, state: &SimulationState) -> SimulationState {
        let params = &self.params;
        // override resolved on every evaluation
        let weights = self.weights.effective();
        let drives = drives(state, &weights);

        let f_w_inf = activation::steady_state_rate(drives.wake, &params.wake, params.wake.beta);
        let f_n_inf =
            activation::steady_state_rate(drives.nrem, &params.nrem, self.nrem_threshold(state.h));
        let f_r_inf = activation::steady_state_rate(drives.rem, &params.rem, params.rem.beta);

        let c_wxi_inf = activation::steady_state_concentration(state.f_w, &params.wxi);
        let c_nxi_inf = activation::steady_state_concentration(state.f_n, &params.nxi);
        let c_rxe_inf = activation::steady_state_concentration(state.f_r, &params.rxe);

        let homeostasis = &params.homeostasis;
        let dh = if state.f_w > homeostasis.wake_threshold {
            (1.0 - state.h) / homeostasis.tau_wake
        } else {
            -state.h / homeostasis.tau_sleep
        };

        SimulationState {
            f_r: (f_r_inf - state.f_r) / params.rem.tau,
            f_n: (f_n_inf - state.f_n) / params.nrem.tau,
            f_w: (f_w_inf - state.f_w) / params.wake.tau,
            c_nxi: (c_nxi_inf - state.c_nxi) / params.nxi.tau,
            c_wxi: (c_wxi_inf - state.c_wxi) / params.wxi.tau,
            c_rxe: (c_rxe_inf - state.c_rxe) / params.rxe.tau,
            h: dh,
        }
    }
}
