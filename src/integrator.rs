//! Fixed-step explicit Euler integration over a uniform time grid.
//!
//! The step size is validated against the fastest time constant of the model:
//! with `step_size <= tau` every relaxation update is a convex combination of
//! the current value and its bounded target, so rates stay in `[0, max_rate]`
//! and concentrations and `h` stay in `[0, 1]`. Each sampled state is checked
//! against these bounds anyway and a violation aborts the run.

use log::debug;

use crate::{
    error::{SimError, SimResult},
    model::{SimulationState, SleepRegulationModel},
    params::{self, IntegrationParams},
    result::{SimulationResult, Variable},
};

const BOUND_TOLERANCE: f64 = 1e-9;

pub fn integrate(
    model: &SleepRegulationModel,
    initial_state: &SimulationState,
    integration_params: &IntegrationParams,
) -> SimResult<SimulationResult> {
    params::validate_integration_params(integration_params, model.params())?;

    let num_samples = integration_params.num_samples();
    let dt = integration_params.step_size;

    debug!(
        "integrating {} samples (step size {} s, alteration site {})",
        num_samples,
        dt,
        model.weights().site_label()
    );

    let mut result = SimulationResult::with_capacity(num_samples);
    let mut state = *initial_state;

    for i in 0..num_samples {
        // grid points are derived from the index so that every run shares the same grid
        let t = i as f64 * dt;
        check_bounds(model, &state, t)?;
        result.push(t, &state);

        let derivative = model.derivative(&state);
        state = state.advanced(&derivative, dt);
    }

    Ok(result)
}

fn check_bounds(model: &SleepRegulationModel, state: &SimulationState, t: f64) -> SimResult<()> {
    let params = model.params();

    let bounded = [
        (Variable::FR, state.f_r, params.rem.max_rate),
        (Variable::FN, state.f_n, params.nrem.max_rate),
        (Variable::FW, state.f_w, params.wake.max_rate),
        (Variable::CNXi, state.c_nxi, 1.0),
        (Variable::CWXi, state.c_wxi, 1.0),
        (Variable::CRXe, state.c_rxe, 1.0),
        (Variable::H, state.h, 1.0),
    ];

    for (variable, value, upper) in bounded {
        if !value.is_finite() || value < -BOUND_TOLERANCE || value > upper + BOUND_TOLERANCE {
            return Err(SimError::NumericInstability { variable, t, value });
        }
    }

    Ok(())
}
