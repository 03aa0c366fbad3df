pub mod analyze;
pub mod classify;

use anyhow::Result;
use pageweight_core::AnalysisConfig;
use std::path::Path;

/// Config file (if any) first, then `--ratio` overrides on top
pub fn load_config(config_file: Option<&Path>, ratio_overrides: &[String]) -> Result<AnalysisConfig> {
    let mut config = match config_file {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    for arg in ratio_overrides
        .iter()
        .flat_map(|r| r.split(',').map(str::trim))
        .filter(|r| !r.is_empty())
    {
        config.apply_ratio_override(arg)?;
    }

    Ok(config)
}
