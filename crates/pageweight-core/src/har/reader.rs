use super::types::Har;
use crate::{Error, Result};

pub struct HarReader;

impl HarReader {
    /// Build a HAR from an already-parsed JSON document
    pub fn from_value(value: serde_json::Value) -> Result<Har> {
        let har: Har = serde_json::from_value(value)?;

        tracing::debug!(
            "Parsed HAR {} from {} with {} entries",
            har.log.version,
            har.log.creator.name,
            har.log.entries.len()
        );

        Ok(har)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Har> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// Validate that a HAR structure is well-formed
    pub fn validate(har: &Har) -> Result<()> {
        if har.log.version.is_empty() {
            return Err(Error::InvalidStructure("Missing HAR version".to_string()));
        }

        if har.log.entries.is_empty() {
            tracing::warn!("HAR file contains no entries");
        }

        for (idx, entry) in har.log.entries.iter().enumerate() {
            if entry.request.url.is_empty() {
                return Err(Error::InvalidStructure(format!(
                    "Entry {} has empty request URL",
                    idx
                )));
            }
        }

        Ok(())
    }
}
