use simple_error::SimpleError;
use thiserror::Error;

use crate::result::Variable;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] SimpleError),

    /// A state variable left its admissible range. Retrying with the same
    /// inputs reproduces the failure.
    #[error("numeric instability: {variable} = {value} at t = {t} s")]
    NumericInstability {
        variable: Variable,
        t: f64,
        value: f64,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
