//! Error types shared across the wiki

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading `config.yaml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config {0:?} is not a YAML mapping")]
    NotAMapping(PathBuf),
}

/// Failures while loading, compiling, or executing a page template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile template {name}: {source}")]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("failed to render template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// Errors surfaced by the request pipeline. Config failures are fatal at
/// startup and never reach a request.
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to save {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WikiError {
    /// The coarsest HTTP status that describes this error
    pub fn status(&self) -> StatusCode {
        match self {
            WikiError::NotFound(_) => StatusCode::NOT_FOUND,
            // The document vanished between stat and read
            WikiError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WikiError::NotFound("/missing".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WikiError::Template(TemplateError::NotFound("default".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = WikiError::Persistence {
            path: PathBuf::from("_doc/a.md"),
            source: io,
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("a.md"));
    }

    #[test]
    fn test_template_errors_convert() {
        let err: WikiError = TemplateError::NotFound("ghost".into()).into();
        assert!(matches!(err, WikiError::Template(TemplateError::NotFound(_))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
