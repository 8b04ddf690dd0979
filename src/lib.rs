pub mod activation;
pub mod batch;
pub mod error;
pub mod hypnogram;
pub mod integrator;
pub mod model;
pub mod params;
pub mod persist;
pub mod result;
pub mod run;
pub mod scenario;

mod types;
mod util;
