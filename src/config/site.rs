//! Site configuration (config.yaml)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Global configuration mapping.
///
/// The file is an arbitrary YAML mapping; templates see every key under
/// `Config`. Key order follows the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config {
    values: IndexMap<String, serde_yaml::Value>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse configuration text. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(mapping) => Ok(Self {
                values: string_keyed(mapping),
            }),
            _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renderer settings from the `markdown` key, defaults when absent or malformed
    pub fn markdown(&self) -> MarkdownSettings {
        self.get("markdown")
            .and_then(|v| match serde_yaml::from_value(v.clone()) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!("Ignoring malformed `markdown` config: {}", e);
                    None
                }
            })
            .unwrap_or_default()
    }
}

/// Markdown renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownSettings {
    pub line_numbers: bool,
    pub highlight_theme: String,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        Self {
            line_numbers: false,
            highlight_theme: "InspiredGitHub".to_string(),
        }
    }
}

/// Convert a YAML mapping into a string-keyed map.
///
/// Scalar keys are stringified; sequence and mapping keys are dropped.
pub(crate) fn string_keyed(mapping: serde_yaml::Mapping) -> IndexMap<String, serde_yaml::Value> {
    mapping
        .into_iter()
        .filter_map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        Config::parse(yaml, &PathBuf::from("config.yaml"))
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
SiteName: My Wiki
menu:
  - home
  - about
2024: year key
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.len(), 3);
        assert_eq!(
            config.get("SiteName").and_then(|v| v.as_str()),
            Some("My Wiki")
        );
        assert!(config.get("menu").unwrap().is_sequence());
        assert!(config.get("2024").is_some());
    }

    #[test]
    fn test_empty_config_is_empty_mapping() {
        let config = parse("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(matches!(
            parse("- a\n- b\n"),
            Err(ConfigError::NotAMapping(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(matches!(
            parse("key: [unterminated"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/definitely/not/here/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_markdown_settings() {
        let config = parse("markdown:\n  line_numbers: true\n").unwrap();
        let settings = config.markdown();
        assert!(settings.line_numbers);
        assert_eq!(settings.highlight_theme, "InspiredGitHub");

        let defaults = parse("title: x").unwrap().markdown();
        assert!(!defaults.line_numbers);
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let config = parse("a: 1\nb: two\n").unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"], "two");
    }
}
