use crate::analysis::Category;
use crate::observation::ValidityRules;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Estimated wire-to-body ratio per category.
///
/// These are heuristics, not measurements: the estimated transfer size of a
/// resource is `round(size * ratio)`. Text assets compress well, images and
/// fonts are assumed to be compressed already.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionRatios {
    pub css: f64,
    pub js: f64,
    pub image: f64,
    pub font: f64,
    pub other: f64,
}

impl CompressionRatios {
    pub const DEFAULT_CSS: f64 = 0.235;
    pub const DEFAULT_JS: f64 = 0.33;
    pub const DEFAULT_IMAGE: f64 = 1.0;
    pub const DEFAULT_FONT: f64 = 1.0;
    pub const DEFAULT_OTHER: f64 = 0.5;

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Css => self.css,
            Category::Js => self.js,
            Category::Image => self.image,
            Category::Font => self.font,
            Category::Other => self.other,
        }
    }

    pub fn set(&mut self, category: Category, ratio: f64) {
        match category {
            Category::Css => self.css = ratio,
            Category::Js => self.js = ratio,
            Category::Image => self.image = ratio,
            Category::Font => self.font = ratio,
            Category::Other => self.other = ratio,
        }
    }

    /// Reject ratios that would make the estimate meaningless
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            let ratio = self.get(category);
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "compression ratio for {} must be a finite number >= 0, got {}",
                    category.as_str(),
                    ratio
                )));
            }
        }
        Ok(())
    }
}

impl Default for CompressionRatios {
    fn default() -> Self {
        Self {
            css: Self::DEFAULT_CSS,
            js: Self::DEFAULT_JS,
            image: Self::DEFAULT_IMAGE,
            font: Self::DEFAULT_FONT,
            other: Self::DEFAULT_OTHER,
        }
    }
}

/// Settings for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ratios: CompressionRatios,
    pub validity: ValidityRules,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file; absent fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading analysis config from: {}", path.display());

        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply a `category=ratio` override such as `css=0.18`
    pub fn apply_ratio_override(&mut self, arg: &str) -> Result<()> {
        let (name, value) = arg.split_once('=').ok_or_else(|| {
            Error::InvalidConfig(format!(
                "ratio override '{}' must look like category=ratio",
                arg
            ))
        })?;

        let category: Category = name.trim().parse()?;
        let ratio = value.trim().parse::<f64>().map_err(|_| {
            Error::InvalidConfig(format!("invalid ratio '{}' for {}", value, name))
        })?;

        let mut ratios = self.ratios;
        ratios.set(category, ratio);
        ratios.validate()?;
        self.ratios = ratios;

        tracing::debug!("Compression ratio for {} set to {}", category.as_str(), ratio);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.ratios.validate()?;
        self.validity.validate()
    }
}
