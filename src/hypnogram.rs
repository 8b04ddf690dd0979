//! Sample-wise sleep stage classification from the Wake and REM transmitter
//! concentrations.
//!
//! A sample is Wake when `C_WXi >= 0.4`; otherwise it is REM when
//! `C_RXe > 0.4` and NREM when not. There is no hysteresis and no minimum bout
//! length, so single-sample flips show up as one-sample bouts.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

pub const WAKE_THRESHOLD: f64 = 0.4;
pub const REM_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SleepStage {
    Nrem = 1,
    Rem = 2,
    Wake = 3,
}

impl SleepStage {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

pub fn classify_sample(c_wxi: f64, c_rxe: f64) -> SleepStage {
    if c_wxi < WAKE_THRESHOLD {
        if c_rxe > REM_THRESHOLD {
            SleepStage::Rem
        } else {
            SleepStage::Nrem
        }
    } else {
        SleepStage::Wake
    }
}

pub fn classify(c_wxi: &[f64], c_rxe: &[f64]) -> Result<Hypnogram, SimpleError> {
    if c_wxi.len() != c_rxe.len() {
        return Err(SimpleError::new(format!(
            "concentration series differ in length: C_WXi has {}, C_RXe has {}",
            c_wxi.len(),
            c_rxe.len()
        )));
    }

    let stages = c_wxi
        .iter()
        .zip(c_rxe)
        .map(|(c_wxi, c_rxe)| classify_sample(*c_wxi, *c_rxe))
        .collect();

    Ok(Hypnogram { stages })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub nrem: usize,
    pub rem: usize,
    pub wake: usize,
}

impl StageCounts {
    pub fn get(&self, stage: SleepStage) -> usize {
        match stage {
            SleepStage::Nrem => self.nrem,
            SleepStage::Rem => self.rem,
            SleepStage::Wake => self.wake,
        }
    }

    pub fn total(&self) -> usize {
        self.nrem + self.rem + self.wake
    }

    pub fn fraction(&self, stage: SleepStage) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.get(stage) as f64 / self.total() as f64
        }
    }
}

/// Maximal run of consecutive samples sharing one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bout {
    pub stage: SleepStage,
    pub start_index: usize,
    pub num_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypnogram {
    stages: Vec<SleepStage>,
}

impl Hypnogram {
    pub fn stages(&self) -> &[SleepStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn codes(&self) -> Vec<u8> {
        self.stages.iter().map(SleepStage::code).collect()
    }

    pub fn counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();

        for stage in &self.stages {
            match stage {
                SleepStage::Nrem => counts.nrem += 1,
                SleepStage::Rem => counts.rem += 1,
                SleepStage::Wake => counts.wake += 1,
            }
        }

        counts
    }

    /// Grid times at which the hypnogram is in `stage`.
    pub fn stage_times(&self, stage: SleepStage, time: &[f64]) -> Vec<f64> {
        self.stages
            .iter()
            .zip(time)
            .filter(|(sample_stage, _)| **sample_stage == stage)
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn bouts(&self) -> Vec<Bout> {
        let mut bouts = Vec::new();
        let mut start_index = 0;

        for (stage, group) in &self.stages.iter().group_by(|stage| **stage) {
            let num_samples = group.count();
            bouts.push(Bout {
                stage,
                start_index,
                num_samples,
            });
            start_index += num_samples;
        }

        bouts
    }

    pub fn num_transitions(&self) -> usize {
        self.stages
            .iter()
            .tuple_windows()
            .filter(|(previous, next)| previous != next)
            .count()
    }
}
