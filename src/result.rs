use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::hypnogram::{self, Hypnogram};
use crate::model::SimulationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    Time,
    FR,
    FN,
    FW,
    CNXi,
    CWXi,
    CRXe,
    H,
}

impl Variable {
    pub const ALL: [Variable; 8] = [
        Variable::Time,
        Variable::FR,
        Variable::FN,
        Variable::FW,
        Variable::CNXi,
        Variable::CWXi,
        Variable::CRXe,
        Variable::H,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variable::Time => "time",
            Variable::FR => "f_R",
            Variable::FN => "f_N",
            Variable::FW => "f_W",
            Variable::CNXi => "C_NXi",
            Variable::CWXi => "C_WXi",
            Variable::CRXe => "C_RXe",
            Variable::H => "h",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full trajectory of one integration run, one entry per grid point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    pub time: Vec<f64>,
    pub f_r: Vec<f64>,
    pub f_n: Vec<f64>,
    pub f_w: Vec<f64>,
    pub c_nxi: Vec<f64>,
    pub c_wxi: Vec<f64>,
    pub c_rxe: Vec<f64>,
    pub h: Vec<f64>,
}

impl SimulationResult {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            time: Vec::with_capacity(capacity),
            f_r: Vec::with_capacity(capacity),
            f_n: Vec::with_capacity(capacity),
            f_w: Vec::with_capacity(capacity),
            c_nxi: Vec::with_capacity(capacity),
            c_wxi: Vec::with_capacity(capacity),
            c_rxe: Vec::with_capacity(capacity),
            h: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, t: f64, state: &SimulationState) {
        self.time.push(t);
        self.f_r.push(state.f_r);
        self.f_n.push(state.f_n);
        self.f_w.push(state.f_w);
        self.c_nxi.push(state.c_nxi);
        self.c_wxi.push(state.c_wxi);
        self.c_rxe.push(state.c_rxe);
        self.h.push(state.h);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn series(&self, variable: Variable) -> &[f64] {
        match variable {
            Variable::Time => &self.time,
            Variable::FR => &self.f_r,
            Variable::FN => &self.f_n,
            Variable::FW => &self.f_w,
            Variable::CNXi => &self.c_nxi,
            Variable::CWXi => &self.c_wxi,
            Variable::CRXe => &self.c_rxe,
            Variable::H => &self.h,
        }
    }

    pub(crate) fn series_mut(&mut self, variable: Variable) -> &mut Vec<f64> {
        match variable {
            Variable::Time => &mut self.time,
            Variable::FR => &mut self.f_r,
            Variable::FN => &mut self.f_n,
            Variable::FW => &mut self.f_w,
            Variable::CNXi => &mut self.c_nxi,
            Variable::CWXi => &mut self.c_wxi,
            Variable::CRXe => &mut self.c_rxe,
            Variable::H => &mut self.h,
        }
    }

    pub fn state_at(&self, index: usize) -> Option<SimulationState> {
        if index >= self.len() {
            return None;
        }

        Some(SimulationState {
            f_r: self.f_r[index],
            f_n: self.f_n[index],
            f_w: self.f_w[index],
            c_nxi: self.c_nxi[index],
            c_wxi: self.c_wxi[index],
            c_rxe: self.c_rxe[index],
            h: self.h[index],
        })
    }

    pub fn hypnogram(&self) -> SimResult<Hypnogram> {
        Ok(hypnogram::classify(&self.c_wxi, &self.c_rxe)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut result = SimulationResult::with_capacity(2);
        let state = SimulationState::default();
        result.push(0.0, &state);
        result.push(
            0.5,
            &SimulationState {
                h: 0.75,
                ..state
            },
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result.series(Variable::Time), &[0.0, 0.5]);
        assert_eq!(result.series(Variable::H), &[0.5, 0.75]);
        assert_eq!(result.state_at(0), Some(state));
        assert_eq!(result.state_at(2), None);
    }

    #[test]
    fn variable_names() {
        let names: Vec<_> = Variable::ALL.iter().map(|variable| variable.name()).collect();
        assert_eq!(
            names,
            ["time", "f_R", "f_N", "f_W", "C_NXi", "C_WXi", "C_RXe", "h"]
        );
    }
}
