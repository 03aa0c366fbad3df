//! Decides which bucket a captured response belongs to.
//!
//! Rules are tried top to bottom and the first match wins, so every counted
//! observation lands in exactly one category.

use super::Category;
use crate::observation::{ResourceObservation, ResourceType};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref STYLESHEET_EXT: Regex =
        Regex::new(r"(?i)\.(css|less|scss|sass|styl)(\?|#|$)").unwrap();
    static ref SCRIPT_EXT: Regex = Regex::new(r"(?i)\.(js|mjs|cjs|jsonp)(\?|#|$)").unwrap();
    static ref IMAGE_EXT: Regex =
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|svg|webp|bmp|tiff)(\?|#|$)").unwrap();
    static ref FONT_EXT: Regex = Regex::new(r"(?i)\.(woff|woff2|ttf|otf|eot)(\?|#|$)").unwrap();
}

const SCRIPT_MIME_TYPES: &[&str] = &[
    "application/javascript",
    "text/javascript",
    "application/x-javascript",
    "module",
];

const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

const FONT_MIME_TYPES: &[&str] = &[
    "font/ttf",
    "font/otf",
    "font/woff",
    "font/woff2",
    "application/font-ttf",
    "application/font-otf",
    "application/font-woff",
    "application/font-woff2",
    "application/vnd.ms-fontobject",
    "application/x-font-ttf",
    "application/x-font-otf",
    "application/x-font-woff",
    "application/x-font-woff2",
];

/// Why an observation was left out of every bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exclusion {
    /// Failed the upstream validity check
    Invalid,
    /// The top-level navigation itself
    Document,
    /// Valid, but no rule claimed it
    Unmatched,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::Invalid => "invalid",
            Exclusion::Document => "document",
            Exclusion::Unmatched => "unmatched",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "outcome", content = "value")]
pub enum Classification {
    Counted(Category),
    Excluded(Exclusion),
}

impl Classification {
    pub fn category(&self) -> Option<Category> {
        match self {
            Classification::Counted(category) => Some(*category),
            Classification::Excluded(_) => None,
        }
    }
}

type Rule = fn(&ResourceObservation, &str) -> bool;

const RULES: [(Category, Rule); 5] = [
    (Category::Css, is_stylesheet),
    (Category::Js, is_script),
    (Category::Image, is_image),
    (Category::Font, is_font),
    (Category::Other, is_other),
];

/// Assign an observation to its category, or say why it is not counted
pub fn classify(obs: &ResourceObservation) -> Classification {
    if !obs.is_valid {
        return Classification::Excluded(Exclusion::Invalid);
    }
    if obs.is_declared(&ResourceType::Document) {
        return Classification::Excluded(Exclusion::Document);
    }

    let content_type = obs.content_type.to_ascii_lowercase();

    RULES
        .iter()
        .find(|(_, rule)| rule(obs, &content_type))
        .map(|(category, _)| Classification::Counted(*category))
        .unwrap_or(Classification::Excluded(Exclusion::Unmatched))
}

fn is_stylesheet(obs: &ResourceObservation, ct: &str) -> bool {
    if !obs.is_declared(&ResourceType::Stylesheet) || ct.contains("font") {
        return false;
    }

    STYLESHEET_EXT.is_match(&obs.url) || ct.contains("text/css") || ct.contains("stylesheet")
}

// A declared stylesheet that failed the gate above is not a script.
fn is_script(obs: &ResourceObservation, ct: &str) -> bool {
    if obs.is_declared(&ResourceType::Stylesheet) {
        return false;
    }

    obs.is_declared(&ResourceType::Script)
        || SCRIPT_EXT.is_match(&obs.url)
        || SCRIPT_MIME_TYPES.iter().any(|t| ct.contains(t))
        || (obs.url.contains("callback=") && ct.contains("application/json"))
}

fn is_image(obs: &ResourceObservation, ct: &str) -> bool {
    obs.is_declared(&ResourceType::Image)
        || IMAGE_MIME_TYPES.iter().any(|t| ct.contains(t))
        || IMAGE_EXT.is_match(&obs.url)
}

fn is_font(obs: &ResourceObservation, ct: &str) -> bool {
    obs.is_declared(&ResourceType::Font)
        || FONT_MIME_TYPES.iter().any(|t| ct.contains(t))
        || FONT_EXT.is_match(&obs.url)
}

fn is_other(obs: &ResourceObservation, _ct: &str) -> bool {
    !matches!(
        obs.declared_type,
        None | Some(
            ResourceType::Document
                | ResourceType::Script
                | ResourceType::Stylesheet
                | ResourceType::Image
                | ResourceType::Font
        )
    )
}
