use super::{
    Initiator, ResourceObservation, ResourceType, ValidityRules, null_as_default,
    observations_from_har,
};
use crate::har::{Har, HarReader};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lenient on-disk form of an observation.
///
/// Missing or `null` metadata reads as empty. `status` defaults to 200,
/// `transferSize` falls back to `size` and `isValid` is derived from the
/// validity rules when the producer left them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub url: String,
    #[serde(default, alias = "type")]
    pub declared_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default)]
    pub transfer_size: Option<u64>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_cache: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub initiator: Initiator,
    #[serde(default, deserialize_with = "null_as_default")]
    pub redirect_chain: Vec<String>,
    #[serde(default)]
    pub is_valid: Option<bool>,
}

impl ObservationRecord {
    pub fn into_observation(self, rules: &ValidityRules) -> ResourceObservation {
        let status = self.status.unwrap_or(200);
        let is_valid = self
            .is_valid
            .unwrap_or_else(|| rules.is_valid(status, self.size, &self.content_type));

        ResourceObservation {
            declared_type: self.declared_type.as_deref().and_then(ResourceType::parse),
            transfer_size: self.transfer_size.unwrap_or(self.size),
            url: self.url,
            content_type: self.content_type,
            size: self.size,
            status,
            from_cache: self.from_cache,
            initiator: self.initiator,
            redirect_chain: self.redirect_chain,
            is_valid,
        }
    }
}

/// Everything the capture layer handed over for one page
#[derive(Debug, Clone, Default)]
pub struct CaptureSet {
    pub analyzed_url: Option<String>,
    pub load_time_ms: Option<f64>,
    pub observations: Vec<ResourceObservation>,
}

impl CaptureSet {
    pub fn from_har(har: &Har, rules: &ValidityRules) -> Self {
        let observations = observations_from_har(har, rules);

        let first_page = har.log.pages.as_ref().and_then(|pages| pages.first());
        let analyzed_url = first_page
            .map(|page| page.title.trim())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .or_else(|| {
                observations
                    .iter()
                    .find(|obs| obs.is_declared(&ResourceType::Document))
                    .map(|obs| obs.url.clone())
            });
        let load_time_ms = first_page
            .and_then(|page| page.page_timings.on_load)
            .filter(|ms| *ms >= 0.0);

        Self {
            analyzed_url,
            load_time_ms,
            observations,
        }
    }

    pub fn from_records(records: Vec<ObservationRecord>, rules: &ValidityRules) -> Self {
        let observations = records
            .into_iter()
            .map(|record| record.into_observation(rules))
            .collect();

        Self {
            analyzed_url: None,
            load_time_ms: None,
            observations,
        }
    }

    /// Read either a HAR document or a JSON array of observations
    pub fn from_file(path: &Path, rules: &ValidityRules) -> Result<Self> {
        tracing::debug!("Reading capture from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let capture = Self::from_str(&content, rules)?;

        tracing::info!(
            "Loaded {} observations from {}",
            capture.observations.len(),
            path.display()
        );

        Ok(capture)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, rules: &ValidityRules) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;

        match value {
            serde_json::Value::Object(ref map) if map.contains_key("log") => {
                let har = HarReader::from_value(value)?;
                HarReader::validate(&har)?;
                Ok(Self::from_har(&har, rules))
            }
            serde_json::Value::Array(items) => Ok(Self::from_records(parse_records(items), rules)),
            _ => Err(Error::UnrecognizedInput(
                "expected a HAR document or a JSON array of observations".to_string(),
            )),
        }
    }
}

/// Parse each record on its own; a malformed one is dropped with a warning
fn parse_records(items: Vec<serde_json::Value>) -> Vec<ObservationRecord> {
    let total = items.len();
    let records: Vec<ObservationRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping observation {}: {}", idx, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        tracing::warn!("Kept {} of {} observations", records.len(), total);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_derive_missing_fields() {
        let json = r#"[
            {"url": "https://cdn.a/app.js", "declaredType": "script", "size": 1000},
            {"url": "https://cdn.a/empty.js", "type": "script", "size": 0},
            {"url": "https://cdn.a/forced.js", "size": 0, "isValid": true, "transferSize": 40}
        ]"#;

        let capture = CaptureSet::from_str(json, &ValidityRules::default()).unwrap();
        let obs = &capture.observations;
        assert_eq!(obs.len(), 3);

        assert!(obs[0].is_valid);
        assert_eq!(obs[0].transfer_size, 1000);
        assert_eq!(obs[0].status, 200);

        assert_eq!(obs[1].declared_type, Some(ResourceType::Script));
        assert!(!obs[1].is_valid);

        assert_eq!(obs[2].declared_type, None);
        assert!(obs[2].is_valid);
        assert_eq!(obs[2].transfer_size, 40);
    }

    #[test]
    fn test_null_metadata_keeps_every_record() {
        let json = r#"[
            {"url": "https://a.com/site.css", "type": "stylesheet", "contentType": "text/css", "size": 500},
            {"url": "https://a.com/app.js", "type": "script", "contentType": null, "size": 900,
             "initiator": {"type": "parser", "url": null}},
            {"url": "https://a.com/logo.png", "type": "image", "size": 40, "status": null,
             "initiator": null, "redirectChain": null}
        ]"#;

        let capture = CaptureSet::from_str(json, &ValidityRules::default()).unwrap();
        let obs = &capture.observations;
        assert_eq!(obs.len(), 3);

        assert_eq!(obs[1].content_type, "");
        assert_eq!(obs[1].initiator, Initiator::new("parser", "", ""));
        assert!(obs[1].is_valid);

        assert_eq!(obs[2].status, 200);
        assert_eq!(obs[2].initiator, Initiator::default());
        assert!(obs[2].redirect_chain.is_empty());
    }

    #[test]
    fn test_malformed_record_only_drops_itself() {
        let json = r#"[
            {"url": "https://a.com/site.css", "type": "stylesheet", "size": 500},
            {"type": "script", "size": 900},
            {"url": "https://a.com/app.js", "type": "script", "size": "big"},
            {"url": "https://a.com/hero.png", "type": "image", "size": 4000}
        ]"#;

        let capture = CaptureSet::from_str(json, &ValidityRules::default()).unwrap();
        let urls: Vec<&str> = capture.observations.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/site.css", "https://a.com/hero.png"]);
    }

    #[test]
    fn test_missing_capture_file() {
        let result = CaptureSet::from_file(
            Path::new("/nonexistent/capture.har"),
            &ValidityRules::default(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_har_page_metadata() {
        let json = r#"{
            "log": {
                "version": "1.2",
                "creator": {"name": "test", "version": "1.0"},
                "pages": [{
                    "startedDateTime": "2025-01-01T00:00:00.000Z",
                    "id": "page_1",
                    "title": "https://a.com/",
                    "pageTimings": {"onContentLoad": 800.5, "onLoad": 1520.25}
                }],
                "entries": [{
                    "request": {"method": "GET", "url": "https://a.com/"},
                    "response": {"status": 200, "content": {"size": 100, "mimeType": "text/html"}},
                    "_resourceType": "document"
                }]
            }
        }"#;

        let capture = CaptureSet::from_str(json, &ValidityRules::default()).unwrap();
        assert_eq!(capture.analyzed_url.as_deref(), Some("https://a.com/"));
        assert_eq!(capture.load_time_ms, Some(1520.25));
        assert_eq!(capture.observations.len(), 1);
    }

    #[test]
    fn test_analyzed_url_falls_back_to_document() {
        let json = r#"{
            "log": {
                "version": "1.2",
                "creator": {"name": "test", "version": "1.0"},
                "entries": [{
                    "request": {"method": "GET", "url": "https://b.com/home"},
                    "response": {"status": 200, "content": {"size": 100}},
                    "_resourceType": "document"
                }]
            }
        }"#;

        let capture = CaptureSet::from_str(json, &ValidityRules::default()).unwrap();
        assert_eq!(capture.analyzed_url.as_deref(), Some("https://b.com/home"));
        assert_eq!(capture.load_time_ms, None);
    }

    #[test]
    fn test_unrecognized_input() {
        let result = CaptureSet::from_str(r#"{"entries": []}"#, &ValidityRules::default());
        assert!(matches!(result, Err(Error::UnrecognizedInput(_))));

        let result = CaptureSet::from_str("not json", &ValidityRules::default());
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
