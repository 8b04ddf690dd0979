//! On-disk layout for run results.
//!
//! ```text
//! <root>/<condition>/Alterations_<site>_<hours>h/Sim<n>/<var>_Alteration_<condition>_<site>_sim<n>.npy
//! ```
//!
//! Arrays are written in NumPy `.npy` format version 1.0, little endian.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    hypnogram::{Hypnogram, StageCounts},
    params::{Alteration, IntegrationParams, SynapticWeights, CONTROL_SITE},
    result::{SimulationResult, Variable},
    run::RunOutput,
};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_HEADER_ALIGNMENT: usize = 64;
const NPY_PREAMBLE_LEN: usize = 10;
const HYPNOGRAM_NAME: &str = "hypnogram";

/// Identity of one persisted result.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactKey<'a> {
    pub condition_label: &'a str,
    pub site_label: &'a str,
    pub duration_hours: f64,
    pub simulation_number: usize,
}

impl<'a> ArtifactKey<'a> {
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(self.condition_label)
            .join(format!(
                "Alterations_{}_{}h",
                self.site_label, self.duration_hours
            ))
            .join(format!("Sim{}", self.simulation_number))
    }

    pub fn file_name(&self, stem: &str, extension: &str) -> String {
        format!(
            "{}_Alteration_{}_{}_sim{}.{}",
            stem, self.condition_label, self.site_label, self.simulation_number, extension
        )
    }

    pub fn path(&self, root: &Path, stem: &str, extension: &str) -> PathBuf {
        self.dir(root).join(self.file_name(stem, extension))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub condition_label: String,
    pub site_label: String,
    pub simulation_number: usize,
    pub alteration: Option<Alteration>,
    pub integration: IntegrationParams,
    pub weights: SynapticWeights,
    pub num_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypnogramSummary {
    pub counts: StageCounts,
    pub num_bouts: usize,
    pub num_transitions: usize,
}

impl HypnogramSummary {
    pub fn from_hypnogram(hypnogram: &Hypnogram) -> Self {
        Self {
            counts: hypnogram.counts(),
            num_bouts: hypnogram.bouts().len(),
            num_transitions: hypnogram.num_transitions(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistedRun {
    pub control_dir: PathBuf,
    pub altered_dir: PathBuf,
}

/// Writes the control and the altered result of a run. When the run has no
/// alteration both results share one directory and it is written once.
pub fn write_run(root: &Path, output: &RunOutput) -> SimResult<PersistedRun> {
    let control_dir = write_control(root, output)?;
    let altered_dir = write_altered(root, output)?.unwrap_or_else(|| control_dir.clone());

    Ok(PersistedRun {
        control_dir,
        altered_dir,
    })
}

pub fn control_key(output: &RunOutput) -> ArtifactKey<'_> {
    ArtifactKey {
        condition_label: &output.condition_label,
        site_label: CONTROL_SITE,
        duration_hours: output.integration.duration_hours,
        simulation_number: output.simulation_number,
    }
}

pub fn write_control(root: &Path, output: &RunOutput) -> SimResult<PathBuf> {
    let manifest = RunManifest {
        condition_label: output.condition_label.clone(),
        site_label: CONTROL_SITE.to_string(),
        simulation_number: output.simulation_number,
        alteration: None,
        integration: output.integration,
        weights: output.control_weights,
        num_samples: output.control.len(),
    };

    write_result(root, &control_key(output), &output.control, &manifest)
}

/// Writes the altered result, or nothing for a run without alteration.
pub fn write_altered(root: &Path, output: &RunOutput) -> SimResult<Option<PathBuf>> {
    let alteration = match output.alteration {
        Some(alteration) => alteration,
        None => return Ok(None),
    };

    let key = ArtifactKey {
        site_label: output.alteration_label(),
        ..control_key(output)
    };

    let manifest = RunManifest {
        condition_label: output.condition_label.clone(),
        site_label: output.alteration_label().to_string(),
        simulation_number: output.simulation_number,
        alteration: Some(alteration),
        integration: output.integration,
        weights: output.altered_weights,
        num_samples: output.altered.len(),
    };

    write_result(root, &key, &output.altered, &manifest).map(Some)
}

pub fn write_result(
    root: &Path,
    key: &ArtifactKey,
    result: &SimulationResult,
    manifest: &RunManifest,
) -> SimResult<PathBuf> {
    let dir = key.dir(root);
    fs::create_dir_all(&dir)?;

    for variable in Variable::ALL {
        write_npy(&key.path(root, variable.name(), "npy"), result.series(variable))?;
    }

    let hypnogram = result.hypnogram()?;
    write_npy(&key.path(root, HYPNOGRAM_NAME, "npy"), &hypnogram.codes())?;

    let summary = HypnogramSummary::from_hypnogram(&hypnogram);
    let mut summary_out = BufWriter::new(File::create(key.path(root, "summary", "json"))?);
    serde_json::to_writer_pretty(&mut summary_out, &summary)?;
    summary_out.flush()?;

    let mut manifest_out = BufWriter::new(File::create(key.path(root, "run", "yaml"))?);
    serde_yaml::to_writer(&mut manifest_out, manifest)?;
    manifest_out.flush()?;

    info!("wrote {} samples to {}", result.len(), dir.display());

    Ok(dir)
}

pub fn read_result(root: &Path, key: &ArtifactKey) -> SimResult<SimulationResult> {
    let mut result = SimulationResult::default();

    for variable in Variable::ALL {
        *result.series_mut(variable) = read_npy(&key.path(root, variable.name(), "npy"))?;
    }

    if Variable::ALL
        .iter()
        .any(|variable| result.series(*variable).len() != result.len())
    {
        return Err(SimError::MalformedArtifact(format!(
            "arrays in {} differ in length",
            key.dir(root).display()
        )));
    }

    Ok(result)
}

pub fn read_manifest(root: &Path, key: &ArtifactKey) -> SimResult<RunManifest> {
    let file = File::open(key.path(root, "run", "yaml"))?;
    Ok(serde_yaml::from_reader(BufReader::new(file))?)
}

pub trait NpyElement: Sized + Copy {
    const DESCR: &'static str;
    const SIZE: usize;

    fn write_le(&self, out: &mut impl Write) -> std::io::Result<()>;
    fn from_le(bytes: &[u8]) -> Self;
}

impl NpyElement for f64 {
    const DESCR: &'static str = "<f8";
    const SIZE: usize = 8;

    fn write_le(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }

    fn from_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        f64::from_le_bytes(buf)
    }
}

impl NpyElement for u8 {
    const DESCR: &'static str = "|u1";
    const SIZE: usize = 1;

    fn write_le(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&[*self])
    }

    fn from_le(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

fn npy_header<T: NpyElement>(len: usize) -> Vec<u8> {
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        T::DESCR,
        len
    );

    let unpadded = NPY_PREAMBLE_LEN + dict.len() + 1;
    let padding = (NPY_HEADER_ALIGNMENT - unpadded % NPY_HEADER_ALIGNMENT) % NPY_HEADER_ALIGNMENT;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let mut header = Vec::with_capacity(NPY_PREAMBLE_LEN + dict.len());
    header.extend_from_slice(NPY_MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header
}

pub fn write_npy<T: NpyElement>(path: &Path, values: &[T]) -> SimResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&npy_header::<T>(values.len()))?;

    for value in values {
        value.write_le(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

pub fn read_npy<T: NpyElement>(path: &Path) -> SimResult<Vec<T>> {
    let malformed = |reason: &str| {
        SimError::MalformedArtifact(format!("{}: {}", path.display(), reason))
    };

    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    if bytes.len() < NPY_PREAMBLE_LEN || &bytes[..NPY_MAGIC.len()] != NPY_MAGIC {
        return Err(malformed("not an npy file"));
    }

    if bytes[6] != 1 {
        return Err(malformed("unsupported npy version"));
    }

    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = NPY_PREAMBLE_LEN + header_len;

    if bytes.len() < data_start {
        return Err(malformed("truncated header"));
    }

    let header = std::str::from_utf8(&bytes[NPY_PREAMBLE_LEN..data_start])
        .map_err(|_| malformed("header is not valid utf-8"))?;

    if !header.contains(&format!("'descr': '{}'", T::DESCR)) {
        return Err(malformed("unexpected element type"));
    }

    if header.contains("'fortran_order': True") {
        return Err(malformed("fortran order is not supported"));
    }

    let len = parse_shape(header).ok_or_else(|| malformed("expected a 1-d shape"))?;
    let data = &bytes[data_start..];

    if data.len() != len * T::SIZE {
        return Err(malformed("data length does not match shape"));
    }

    Ok(data.chunks_exact(T::SIZE).map(T::from_le).collect())
}

fn parse_shape(header: &str) -> Option<usize> {
    let start = header.find("'shape': (")? + "'shape': (".len();
    let end = start + header[start..].find(')')?;
    let dims: Vec<&str> = header[start..end]
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .collect();

    match dims.as_slice() {
        [len] => len.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimulationState;
    use crate::params::Synapse;
    use crate::run::{self, RunConfig};
    use crate::util::test_util;

    #[test]
    fn header_is_aligned() {
        for len in [0, 1, 57600, 1_000_000_000] {
            let header = npy_header::<f64>(len);
            assert_eq!(header.len() % NPY_HEADER_ALIGNMENT, 0);
            assert_eq!(*header.last().unwrap(), b'\n');
        }
    }

    #[test]
    fn npy_round_trip() {
        let dir = test_util::scratch_dir("npy_round_trip");
        let path = dir.join("values.npy");
        let values = [0.0, -1.5, 3.25, f64::MAX];

        write_npy(&path, &values).unwrap();
        assert_eq!(read_npy::<f64>(&path).unwrap(), values);

        let codes = [3u8, 1, 2];
        write_npy(&path, &codes).unwrap();
        assert_eq!(read_npy::<u8>(&path).unwrap(), codes);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn wrong_element_type() {
        let dir = test_util::scratch_dir("wrong_element_type");
        let path = dir.join("codes.npy");
        write_npy(&path, &[1u8, 2, 3]).unwrap();

        assert!(matches!(
            read_npy::<f64>(&path),
            Err(SimError::MalformedArtifact(_))
        ));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file() {
        let dir = test_util::scratch_dir("missing_file");
        assert!(matches!(
            read_npy::<f64>(&dir.join("absent.npy")),
            Err(SimError::Io(_))
        ));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn shape_parsing() {
        assert_eq!(
            parse_shape("{'descr': '<f8', 'fortran_order': False, 'shape': (12,), }"),
            Some(12)
        );
        assert_eq!(
            parse_shape("{'descr': '<f8', 'fortran_order': False, 'shape': (3, 4), }"),
            None
        );
    }

    #[test]
    fn unwritable_root() {
        let dir = test_util::scratch_dir("unwritable_root");
        let root = dir.join("occupied");
        fs::write(&root, b"not a directory").unwrap();

        let config = RunConfig {
            condition_label: "Lesion".to_string(),
            simulation_number: 1,
            alteration: Some(Alteration {
                synapse: Synapse::RRe,
                value: 0.0,
            }),
            params: test_util::get_template_simulation_params(),
        };
        let output = run::run_sim(&config).unwrap();

        assert!(matches!(write_run(&root, &output), Err(SimError::Io(_))));
        assert!(matches!(write_control(&root, &output), Err(SimError::Io(_))));
        assert!(matches!(write_altered(&root, &output), Err(SimError::Io(_))));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn control_and_altered_written_separately() {
        let dir = test_util::scratch_dir("control_and_altered_written_separately");

        let mut config = RunConfig {
            condition_label: "Control".to_string(),
            simulation_number: 2,
            alteration: None,
            params: test_util::get_template_simulation_params(),
        };
        let output = run::run_sim(&config).unwrap();

        assert_eq!(write_altered(&dir, &output).unwrap(), None);
        let control_dir = write_control(&dir, &output).unwrap();
        assert_eq!(control_dir, control_key(&output).dir(&dir));
        assert_eq!(read_result(&dir, &control_key(&output)).unwrap(), output.control);

        config.alteration = Some(Alteration {
            synapse: Synapse::WNi,
            value: -1.0,
        });
        let output = run::run_sim(&config).unwrap();
        let altered_dir = write_altered(&dir, &output).unwrap().unwrap();

        assert_eq!(
            altered_dir,
            dir.join("Control").join("Alterations_g_WNi_0.25h").join("Sim2")
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn directory_layout() {
        let key = ArtifactKey {
            condition_label: "Lesion",
            site_label: "g_RRe",
            duration_hours: 16.0,
            simulation_number: 2,
        };

        assert_eq!(
            key.path(Path::new("out"), "C_WXi", "npy"),
            Path::new("out/Lesion/Alterations_g_RRe_16h/Sim2/C_WXi_Alteration_Lesion_g_RRe_sim2.npy")
        );
    }

    #[test]
    fn result_round_trip() {
        let dir = test_util::scratch_dir("result_round_trip");
        let key = ArtifactKey {
            condition_label: "Control",
            site_label: CONTROL_SITE,
            duration_hours: 1.0,
            simulation_number: 1,
        };

        let mut result = SimulationResult::default();
        result.push(0.0, &SimulationState::default());
        result.push(
            0.5,
            &SimulationState {
                c_wxi: 0.1,
                c_rxe: 0.7,
                ..SimulationState::default()
            },
        );

        let manifest = RunManifest {
            condition_label: "Control".to_string(),
            site_label: CONTROL_SITE.to_string(),
            simulation_number: 1,
            alteration: None,
            integration: IntegrationParams::default(),
            weights: SynapticWeights::default(),
            num_samples: result.len(),
        };

        write_result(&dir, &key, &result, &manifest).unwrap();

        assert_eq!(read_result(&dir, &key).unwrap(), result);
        assert_eq!(read_manifest(&dir, &key).unwrap().num_samples, 2);
        assert_eq!(
            read_npy::<u8>(&key.path(&dir, HYPNOGRAM_NAME, "npy")).unwrap(),
            [3, 2]
        );

        fs::remove_dir_all(dir).unwrap();
    }
}
