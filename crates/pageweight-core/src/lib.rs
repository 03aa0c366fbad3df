pub mod analysis;
pub mod config;
pub mod error;
pub mod har;
pub mod observation;

pub use config::{AnalysisConfig, CompressionRatios};
pub use error::{Error, Result};
