use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{try_with, SimpleError};

use crate::{
    batch,
    error::SimResult,
    params::{SimulationParams, SynapticWeights, TechnicalParams},
    persist::{self, PersistedRun},
    run::{self, RunConfig, RunOutput},
    types::HashSet,
};

/// Condition label, duration bits and simulation number of a control directory.
type ControlId = (String, u64, usize);

/// An experiment: every condition is run for simulation numbers `1..=nb_sims`
/// and persisted below `output_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub output_dir: PathBuf,
    pub nb_sims: usize,
    #[serde(default)]
    pub technical_params: TechnicalParams,
    #[serde(default)]
    pub params: SimulationParams,
    pub conditions: Vec<ConditionParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionParams {
    pub condition_label: String,
    pub alteration_site: String,
    #[serde(default)]
    pub weights: SynapticWeights,
}

impl Scenario {
    pub fn from_yaml_str(yaml: &str) -> SimResult<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        validate_scenario(&scenario)?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> SimResult<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    pub fn run_configs(&self) -> SimResult<Vec<RunConfig>> {
        let mut configs = Vec::with_capacity(self.conditions.len() * self.nb_sims);

        for condition in &self.conditions {
            for simulation_number in 1..=self.nb_sims {
                configs.push(run::config_from_weights(
                    &self.params,
                    simulation_number,
                    &condition.alteration_site,
                    &condition.condition_label,
                    condition.weights,
                )?);
            }
        }

        Ok(configs)
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), SimpleError> {
    if scenario.output_dir.as_os_str().is_empty() {
        return Err(SimpleError::new("output_dir must not be empty"));
    }

    if scenario.nb_sims == 0 {
        return Err(SimpleError::new("nb_sims must be strictly positive"));
    }

    if scenario.conditions.is_empty() {
        return Err(SimpleError::new("at least one condition is required"));
    }

    Ok(())
}

/// Runs every configured simulation and persists each successful run. The
/// outer error covers configuration problems of the scenario as a whole.
/// Runs sharing a control directory write it once.
pub fn run_scenario(scenario: &Scenario) -> SimResult<Vec<SimResult<PersistedRun>>> {
    try_with!(validate_scenario(scenario), "invalid scenario");

    let configs = scenario.run_configs()?;
    let results = batch::run_batch(&configs, &scenario.technical_params)?;

    let mut written_controls = HashSet::default();
    let mut persisted = Vec::with_capacity(results.len());

    for result in results {
        persisted.push(persist_output(
            &scenario.output_dir,
            result,
            &mut written_controls,
        ));
    }

    Ok(persisted)
}

fn persist_output(
    root: &Path,
    result: SimResult<RunOutput>,
    written_controls: &mut HashSet<ControlId>,
) -> SimResult<PersistedRun> {
    let output = result?;

    let control = output.control_hypnogram()?.counts();
    let altered = output.altered_hypnogram()?.counts();
    info!(
        "{} sim {}: REM samples ctrl {} / {} {}, wake samples ctrl {} / {} {}",
        output.condition_label,
        output.simulation_number,
        control.rem,
        output.alteration_label(),
        altered.rem,
        control.wake,
        output.alteration_label(),
        altered.wake
    );

    let control_id = (
        output.condition_label.clone(),
        output.integration.duration_hours.to_bits(),
        output.simulation_number,
    );

    let control_dir = if written_controls.contains(&control_id) {
        persist::control_key(&output).dir(root)
    } else {
        let dir = persist::write_control(root, &output)?;
        written_controls.insert(control_id);
        dir
    };

    let altered_dir =
        persist::write_altered(root, &output)?.unwrap_or_else(|| control_dir.clone());

    Ok(PersistedRun {
        control_dir,
        altered_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::params::{Alteration, Synapse};
    use crate::util::test_util;

    const YAML: &str = r#"
output_dir: out
nb_sims: 2
conditions:
- condition_label: Control
  alteration_site: ctrl
- condition_label: Lesion
  alteration_site: g_RRe
  weights:
    g_RRe: 0.0
    g_RWe: 1.0
    g_WNi: -2.0
    g_WRi: -4.0
    g_NRi: -1.3
    g_NWi: -1.68
"#;

    #[test]
    fn parse_with_defaults() {
        let scenario = Scenario::from_yaml_str(YAML).unwrap();

        assert_eq!(scenario.nb_sims, 2);
        assert_eq!(scenario.params, SimulationParams::default());
        assert_eq!(scenario.conditions[0].weights, SynapticWeights::default());
        assert_eq!(scenario.conditions[1].weights.g_rre, 0.0);
    }

    #[test]
    fn expands_conditions_and_simulation_numbers() {
        let configs = Scenario::from_yaml_str(YAML).unwrap().run_configs().unwrap();

        let keys: Vec<_> = configs
            .iter()
            .map(|config| {
                (
                    config.condition_label.as_str(),
                    config.alteration_label(),
                    config.simulation_number,
                )
            })
            .collect();

        assert_eq!(
            keys,
            [
                ("Control", "ctrl", 1),
                ("Control", "ctrl", 2),
                ("Lesion", "g_RRe", 1),
                ("Lesion", "g_RRe", 2),
            ]
        );

        assert_eq!(
            configs[2].alteration,
            Some(Alteration {
                synapse: Synapse::RRe,
                value: 0.0
            })
        );
        assert_eq!(configs[2].params.weights, SynapticWeights::default());
    }

    #[test]
    fn zero_simulations() {
        let yaml = YAML.replace("nb_sims: 2", "nb_sims: 0");
        let result = Scenario::from_yaml_str(&yaml);

        match result {
            Err(SimError::Configuration(err)) => {
                assert_eq!(err.as_str(), "nb_sims must be strictly positive")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_alteration_site() {
        let yaml = YAML.replace("alteration_site: g_RRe", "alteration_site: g_RRx");
        let result = Scenario::from_yaml_str(&yaml).unwrap().run_configs();

        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    fn lesion_block(root: &Path) -> Scenario {
        Scenario {
            output_dir: root.to_path_buf(),
            nb_sims: 1,
            technical_params: TechnicalParams::default(),
            params: test_util::get_template_simulation_params(),
            conditions: vec![
                ConditionParams {
                    condition_label: "Lesion".to_string(),
                    alteration_site: "ctrl".to_string(),
                    weights: SynapticWeights::default(),
                },
                ConditionParams {
                    condition_label: "Lesion".to_string(),
                    alteration_site: "g_RRe".to_string(),
                    weights: SynapticWeights {
                        g_rre: 0.0,
                        ..SynapticWeights::default()
                    },
                },
            ],
        }
    }

    #[test]
    fn shared_control_directory() {
        let root = test_util::scratch_dir("shared_control_directory");
        let persisted = run_scenario(&lesion_block(&root)).unwrap();

        let runs: Vec<_> = persisted.into_iter().map(|run| run.unwrap()).collect();
        let control_dir = root.join("Lesion").join("Alterations_ctrl_0.25h").join("Sim1");

        assert_eq!(runs[0].control_dir, control_dir);
        assert_eq!(runs[0].altered_dir, control_dir);
        assert_eq!(runs[1].control_dir, control_dir);
        assert_eq!(
            runs[1].altered_dir,
            root.join("Lesion").join("Alterations_g_RRe_0.25h").join("Sim1")
        );
        assert_eq!(fs::read_dir(root.join("Lesion")).unwrap().count(), 2);

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn conflicting_control_directory() {
        let root = test_util::scratch_dir("conflicting_control_directory");
        let mut scenario = lesion_block(&root);
        scenario.conditions[1].weights.g_rwe = 0.5;

        let result = run_scenario(&scenario);

        assert!(matches!(result, Err(SimError::Configuration(_))));
        assert!(!root.join("Lesion").exists());

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn malformed_yaml() {
        let result = Scenario::from_yaml_str("nb_sims: [");
        assert!(matches!(result, Err(SimError::Yaml(_))));
    }
}
