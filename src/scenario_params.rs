use somnus::scenario::Scenario;

pub fn get_scenario_params() -> Scenario {
    let params_yaml_str = r#"
output_dir: results
nb_sims: 1
technical_params:
  num_threads: null
  pin_threads: false
params:
  model:
    wake:
      max_rate: 6.5
      alpha: 0.5
      beta: -0.4
      tau: 25.0
    nrem:
      max_rate: 5.0
      alpha: 0.175
      beta: 0.0
      tau: 10.0
    rem:
      max_rate: 5.0
      alpha: 0.13
      beta: -0.9
      tau: 1.0
    wxi:
      gamma: 5.0
      tau: 25.0
    nxi:
      gamma: 4.0
      tau: 10.0
    rxe:
      gamma: 2.0
      tau: 10.0
    homeostasis:
      wake_threshold: 2.0
      tau_wake: 34830.0
      tau_sleep: 30600.0
      nrem_threshold_gain: 1.5
  weights:
    g_RRe: 1.6
    g_RWe: 1.0
    g_WNi: -2.0
    g_WRi: -4.0
    g_NRi: -1.3
    g_NWi: -1.68
  integration:
    duration_hours: 16.0
    step_size: 0.5
  initial_state:
    f_r: 0.0
    f_n: 0.0
    f_w: 6.0
    c_nxi: 0.0
    c_wxi: 0.9
    c_rxe: 0.0
    h: 0.5
conditions:
- condition_label: Control
  alteration_site: ctrl
  weights:
    g_RRe: 1.6
    g_RWe: 1.0
    g_WNi: -2.0
    g_WRi: -4.0
    g_NRi: -1.3
    g_NWi: -1.68
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

    Scenario::from_yaml_str(params_yaml_str).unwrap()
}
