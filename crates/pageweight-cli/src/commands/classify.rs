use crate::OutputFormat;
use anyhow::Result;
use pageweight_core::analysis::{Classification, classify, format_size};
use pageweight_core::observation::CaptureSet;
use std::path::{Path, PathBuf};

/// How one observation was classified
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedObservation {
    pub url: String,
    pub declared_type: Option<String>,
    pub status: u16,
    pub size: u64,
    pub classification: Classification,
}

impl ClassifiedObservation {
    /// Category name, or the exclusion reason
    pub fn outcome(&self) -> &'static str {
        match self.classification {
            Classification::Counted(category) => category.as_str(),
            Classification::Excluded(reason) => reason.as_str(),
        }
    }
}

/// Classify every observation in a capture file, in capture order
pub fn classify_file(
    file: &Path,
    config_file: Option<&Path>,
) -> Result<Vec<ClassifiedObservation>> {
    let config = super::load_config(config_file, &[])?;
    let capture = CaptureSet::from_file(file, &config.validity)?;

    Ok(capture
        .observations
        .iter()
        .map(|obs| ClassifiedObservation {
            url: obs.url.clone(),
            declared_type: obs.declared_type.as_ref().map(|t| t.to_string()),
            status: obs.status,
            size: obs.size,
            classification: classify(obs),
        })
        .collect())
}

pub fn execute(
    file: &Path,
    config_file: Option<PathBuf>,
    excluded_only: bool,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Classifying capture: {}", file.display());

    let rows: Vec<ClassifiedObservation> = classify_file(file, config_file.as_deref())?
        .into_iter()
        .filter(|row| !excluded_only || row.classification.category().is_none())
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{:<10} {:<12} {:>6} {:>14}  URL",
                "Outcome", "Declared", "Status", "Size"
            );
            for row in &rows {
                println!(
                    "{:<10} {:<12} {:>6} {:>14}  {}",
                    row.outcome(),
                    row.declared_type.as_deref().unwrap_or("-"),
                    row.status,
                    format_size(row.size),
                    row.url
                );
            }
        }
    }

    Ok(())
}
