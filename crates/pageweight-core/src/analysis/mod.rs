mod bucket;
mod classify;
mod format;
mod normalize;
mod report;
mod run;

pub use bucket::{CategoryBucket, DedupedEntry, DomainBucket, DomainStats, RequestSummary};
pub use classify::{Classification, Exclusion, classify};
pub use format::{format_duration_ms, format_size};
pub use normalize::normalize_url;
pub use report::{AggregateReport, CategoryReport, ReportBuilder};
pub use run::AnalysisRun;

use crate::observation::{CaptureSet, ResourceObservation};
use crate::{AnalysisConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket a counted resource lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Css,
    Js,
    Image,
    Font,
    Other,
}

impl Category {
    /// Report order
    pub const ALL: [Category; 5] = [
        Category::Css,
        Category::Js,
        Category::Image,
        Category::Font,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Css => "css",
            Category::Js => "js",
            Category::Image => "image",
            Category::Font => "font",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Css => "CSS",
            Category::Js => "JavaScript",
            Category::Image => "Images",
            Category::Font => "Fonts",
            Category::Other => "Other",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "css" | "stylesheet" | "stylesheets" => Ok(Category::Css),
            "js" | "script" | "scripts" | "javascript" => Ok(Category::Js),
            "image" | "images" | "img" => Ok(Category::Image),
            "font" | "fonts" => Ok(Category::Font),
            "other" => Ok(Category::Other),
            _ => Err(Error::InvalidConfig(format!(
                "unknown category '{}' (expected css, js, image, font or other)",
                s
            ))),
        }
    }
}

pub trait Analyzer {
    type Output;

    fn analyze(&self, capture: &CaptureSet) -> crate::Result<Self::Output>;
}

/// Runs a whole capture through a fresh [`AnalysisRun`]
#[derive(Debug, Clone, Default)]
pub struct ResourceAnalyzer {
    config: AnalysisConfig,
}

impl ResourceAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Classify and aggregate a batch without page metadata
    pub fn analyze_observations(
        &self,
        observations: &[ResourceObservation],
    ) -> Result<AggregateReport> {
        self.config.validate()?;

        let mut run = AnalysisRun::new(self.config.ratios);
        run.ingest_all(observations);
        Ok(run.finish())
    }
}

impl Analyzer for ResourceAnalyzer {
    type Output = AggregateReport;

    fn analyze(&self, capture: &CaptureSet) -> Result<Self::Output> {
        tracing::debug!(
            "Analyzing {} captured observations",
            capture.observations.len()
        );

        self.config.validate()?;

        let mut run = AnalysisRun::new(self.config.ratios);
        if let Some(url) = &capture.analyzed_url {
            run.set_analyzed_url(url);
        }
        if let Some(ms) = capture.load_time_ms {
            run.set_load_time_ms(ms);
        }
        run.ingest_all(&capture.observations);

        let report = run.finish();

        tracing::info!(
            "Resource analysis complete: {} requests, {} total",
            report.total_requests,
            report.total_raw_size_display
        );

        Ok(report)
    }
}
