//! The subset of HAR 1.2 needed to rebuild resource observations, plus the
//! underscore-prefixed fields Chrome DevTools adds to its exports.
//!
//! Fields the engine never reads (cookies, timings, post data) are left out;
//! serde skips them when parsing.

use serde::{Deserialize, Serialize};

/// Top-level HAR object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Har {
    pub log: Log,
}

/// Main HAR log object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub version: String,
    pub creator: Creator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    pub entries: Vec<Entry>,
}

/// Creator/Browser information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    pub version: String,
}

/// Page information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "startedDateTime")]
    pub started_date_time: String,
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "pageTimings", default)]
    pub page_timings: PageTimings,
}

/// Page timing information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageTimings {
    #[serde(rename = "onContentLoad", skip_serializing_if = "Option::is_none")]
    pub on_content_load: Option<f64>,
    #[serde(rename = "onLoad", skip_serializing_if = "Option::is_none")]
    pub on_load: Option<f64>,
}

/// Individual HTTP transaction entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "pageref", skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(rename = "startedDateTime", default)]
    pub started_date_time: String,
    #[serde(default)]
    pub time: f64,
    pub request: Request,
    pub response: Response,
    #[serde(rename = "_resourceType", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(rename = "_initiator", skip_serializing_if = "Option::is_none")]
    pub initiator: Option<EntryInitiator>,
    #[serde(rename = "_transferSize", skip_serializing_if = "Option::is_none")]
    pub transfer_size: Option<i64>,
    #[serde(rename = "_fromCache", skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<String>,
}

/// HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: i64,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub content: Content,
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: String,
    #[serde(rename = "bodySize", default)]
    pub body_size: i64,
}

impl Response {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// HTTP header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Response content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

/// Chrome's record of what caused the request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryInitiator {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<CallStack>,
}

impl EntryInitiator {
    /// URL of the innermost script frame that issued the request
    pub fn top_frame_url(&self) -> Option<&str> {
        self.stack.as_ref()?.top_frame_url()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallStack {
    #[serde(rename = "callFrames", default)]
    pub call_frames: Vec<CallFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<CallStack>>,
}

impl CallStack {
    fn top_frame_url(&self) -> Option<&str> {
        self.call_frames
            .first()
            .map(|frame| frame.url.as_str())
            .or_else(|| self.parent.as_deref().and_then(|p| p.top_frame_url()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "functionName", default)]
    pub function_name: String,
}
