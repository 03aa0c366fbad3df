use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Decides whether a captured response should be counted at all.
///
/// A response counts when its status is in the accepted range and it carried
/// a body. Some resources are empty on purpose (`204 No Content`, an empty
/// JSON reply), so zero-byte bodies are allowed for the listed statuses and
/// content types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidityRules {
    pub min_status: u16,
    pub max_status: u16,
    pub empty_body_statuses: Vec<u16>,
    pub empty_body_content_types: Vec<String>,
    pub reject_empty_bodies: bool,
}

impl Default for ValidityRules {
    fn default() -> Self {
        Self {
            min_status: 200,
            max_status: 299,
            empty_body_statuses: vec![204],
            empty_body_content_types: vec![
                "application/json".to_string(),
                "text/plain".to_string(),
            ],
            reject_empty_bodies: true,
        }
    }
}

impl ValidityRules {
    pub fn is_valid(&self, status: u16, size: u64, content_type: &str) -> bool {
        if status < self.min_status || status > self.max_status {
            return false;
        }

        if size > 0 || !self.reject_empty_bodies {
            return true;
        }

        if self.empty_body_statuses.contains(&status) {
            return true;
        }

        let essence = mime_essence(content_type);
        !essence.is_empty()
            && self
                .empty_body_content_types
                .iter()
                .any(|allowed| mime_essence(allowed) == essence)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_status > self.max_status {
            return Err(Error::InvalidConfig(format!(
                "status range {}-{} is empty",
                self.min_status, self.max_status
            )));
        }
        Ok(())
    }
}

/// `type/subtype` in lower case, parameters dropped
fn mime_essence(content_type: &str) -> String {
    match content_type.trim().parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_ascii_lowercase(),
        Err(_) => content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    }
}
