//! Resource observations: one captured network response plus the request
//! metadata the engine classifies on.

mod convert;
mod reader;
mod validity;

pub use convert::observations_from_har;
pub use reader::{CaptureSet, ObservationRecord};
pub use validity::ValidityRules;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Resource type reported by the capture layer (CDP / DevTools names)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Script,
    Image,
    Font,
    Media,
    Xhr,
    Fetch,
    EventSource,
    WebSocket,
    Manifest,
    TextTrack,
    Prefetch,
    Ping,
    Preflight,
    Other,
    Unknown(String),
}

impl ResourceType {
    /// Parse a declared type; blank input means the capture layer gave none
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self::from(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Script => "script",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
            ResourceType::Media => "media",
            ResourceType::Xhr => "xhr",
            ResourceType::Fetch => "fetch",
            ResourceType::EventSource => "eventsource",
            ResourceType::WebSocket => "websocket",
            ResourceType::Manifest => "manifest",
            ResourceType::TextTrack => "texttrack",
            ResourceType::Prefetch => "prefetch",
            ResourceType::Ping => "ping",
            ResourceType::Preflight => "preflight",
            ResourceType::Other => "other",
            ResourceType::Unknown(value) => value,
        }
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "document" => ResourceType::Document,
            "stylesheet" => ResourceType::Stylesheet,
            "script" => ResourceType::Script,
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            "media" => ResourceType::Media,
            "xhr" => ResourceType::Xhr,
            "fetch" => ResourceType::Fetch,
            "eventsource" => ResourceType::EventSource,
            "websocket" => ResourceType::WebSocket,
            "manifest" => ResourceType::Manifest,
            "texttrack" => ResourceType::TextTrack,
            "prefetch" => ResourceType::Prefetch,
            "ping" => ResourceType::Ping,
            "preflight" => ResourceType::Preflight,
            "other" => ResourceType::Other,
            _ => ResourceType::Unknown(value),
        }
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who triggered a request. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Initiator {
    #[serde(alias = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub top_frame_url: String,
}

impl Initiator {
    pub fn new(kind: &str, url: &str, top_frame_url: &str) -> Self {
        Self {
            kind: kind.to_string(),
            url: url.to_string(),
            top_frame_url: top_frame_url.to_string(),
        }
    }
}

/// One captured response, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObservation {
    pub url: String,
    #[serde(
        default,
        deserialize_with = "deserialize_declared_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub declared_type: Option<ResourceType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transfer_size: u64,
    #[serde(default)]
    pub status: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_cache: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub initiator: Initiator,
    #[serde(default, deserialize_with = "null_as_default")]
    pub redirect_chain: Vec<String>,
    pub is_valid: bool,
}

impl ResourceObservation {
    /// A valid 200 response with no body and no metadata
    pub fn new(url: &str, declared_type: Option<ResourceType>) -> Self {
        Self {
            url: url.to_string(),
            declared_type,
            content_type: String::new(),
            size: 0,
            transfer_size: 0,
            status: 200,
            from_cache: false,
            initiator: Initiator::default(),
            redirect_chain: Vec::new(),
            is_valid: true,
        }
    }

    /// Set the body size; the transfer size follows unless set afterwards
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self.transfer_size = size;
        self
    }

    pub fn with_transfer_size(mut self, transfer_size: u64) -> Self {
        self.transfer_size = transfer_size;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_initiator(mut self, initiator: Initiator) -> Self {
        self.initiator = initiator;
        self
    }

    pub fn with_redirects(mut self, redirect_chain: Vec<String>) -> Self {
        self.redirect_chain = redirect_chain;
        self
    }

    pub fn with_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    pub fn with_validity(mut self, is_valid: bool) -> Self {
        self.is_valid = is_valid;
        self
    }

    pub fn is_declared(&self, resource_type: &ResourceType) -> bool {
        self.declared_type.as_ref() == Some(resource_type)
    }
}

/// An explicit `null` reads like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_declared_type<'de, D>(deserializer: D) -> Result<Option<ResourceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(ResourceType::parse))
}
