//! Front-matter splitting and parsing
//!
//! A document is a YAML metadata block, a line starting with `---`, then the
//! Markdown body:
//!
//! ```text
//! Title: Hello
//! Template: wide
//! ---
//! # Hello
//! ```
//!
//! The block ends at the first `\n---`. Everything before it is metadata,
//! everything after the four marker bytes is body.

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::string_keyed;

/// Terminates the metadata block
const MARKER: &str = "\n---";

/// Template used when a document does not name one
pub const DEFAULT_TEMPLATE: &str = "default";

/// Split a document into `(metadata, body)`.
///
/// Without a marker the whole document is body and metadata is empty.
pub fn split(content: &str) -> (&str, &str) {
    match content.find(MARKER) {
        Some(end) => (&content[..end], &content[end + MARKER.len()..]),
        None => ("", content),
    }
}

/// Metadata of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, body). Never fails: unusable metadata is empty.
    pub fn parse(content: &str) -> (Self, &str) {
        let (yaml, body) = split(content);
        (Self::from_yaml(yaml), body)
    }

    fn from_yaml(yaml: &str) -> Self {
        if yaml.trim().is_empty() {
            return Self::default();
        }

        match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
            Ok(serde_yaml::Value::Mapping(mapping)) => Self {
                fields: string_keyed(mapping),
            },
            Ok(_) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to parse front-matter, using empty metadata: {}", e);
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.fields.get(key)
    }

    /// `Title`, or empty if absent or not a string
    pub fn title(&self) -> &str {
        self.get_str("Title").unwrap_or("")
    }

    /// `Template`, or [`DEFAULT_TEMPLATE`] if absent or not a string
    pub fn template(&self) -> &str {
        self.get_str("Template").unwrap_or(DEFAULT_TEMPLATE)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}
