//! Request classification
//!
//! Ordered, first match wins:
//!
//! 1. `?edit=1` serves the editor shell, whether or not the page exists
//! 2. `?post=1` on a POST saves the `content` form field to `<path>.md`
//! 3. `<path>` is a directory
//! 4. `<path>` is a file, served as-is
//! 5. `<path>.md` is a file, rendered as a page
//! 6. not found
//!
//! The query is inspected before touching the filesystem. A real file named
//! `about` wins over `about.md`.

use axum::extract::Query;
use axum::http::{Method, Uri};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What a request asks for, from its query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Intent {
    #[serde(default)]
    edit: Option<String>,
    #[serde(default)]
    post: Option<String>,
}

impl Intent {
    /// Read `edit` and `post` from a request URI; a malformed query means neither
    pub fn from_uri(uri: &Uri) -> Self {
        Query::<Intent>::try_from_uri(uri)
            .map(|Query(intent)| intent)
            .unwrap_or_default()
    }

    pub fn is_edit(&self) -> bool {
        self.edit.as_deref() == Some("1")
    }

    pub fn is_post(&self) -> bool {
        self.post.as_deref() == Some("1")
    }
}

/// How a request will be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Edit,
    Save { md_path: PathBuf },
    Directory { path: PathBuf },
    Raw { path: PathBuf },
    Markdown { path: PathBuf, mtime: SystemTime },
    NotFound,
}

/// Normalize a request path: percent-decode, drop empty and `.` segments,
/// resolve `..` without climbing above the root. Always starts with `/`.
pub fn clean_path(url_path: &str) -> String {
    let decoded = percent_decode_str(url_path).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Filesystem location of a cleaned path
pub fn raw_path(doc_root: &Path, clean: &str) -> PathBuf {
    let relative = clean.trim_start_matches('/');
    if relative.is_empty() {
        doc_root.to_path_buf()
    } else {
        doc_root.join(relative)
    }
}

/// The Markdown candidate `<path>.md`. The root itself has none.
pub fn markdown_path(doc_root: &Path, clean: &str) -> Option<PathBuf> {
    if clean.trim_start_matches('/').is_empty() {
        return None;
    }
    let mut path: OsString = raw_path(doc_root, clean).into_os_string();
    path.push(".md");
    Some(PathBuf::from(path))
}

/// Classify a request. `clean` must come from [`clean_path`].
pub async fn classify(doc_root: &Path, clean: &str, intent: &Intent, method: &Method) -> Resolution {
    if intent.is_edit() {
        return Resolution::Edit;
    }

    if intent.is_post() && *method == Method::POST {
        return match markdown_path(doc_root, clean) {
            Some(md_path) => Resolution::Save { md_path },
            None => Resolution::NotFound,
        };
    }

    // Stat failures of any kind count as "not there"
    let raw = raw_path(doc_root, clean);
    if let Ok(meta) = tokio::fs::metadata(&raw).await {
        if meta.is_dir() {
            return Resolution::Directory { path: raw };
        }
        if meta.is_file() {
            return Resolution::Raw { path: raw };
        }
    }

    if let Some(md) = markdown_path(doc_root, clean) {
        if let Ok(meta) = tokio::fs::metadata(&md).await {
            if meta.is_file() {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                return Resolution::Markdown { path: md, mtime };
            }
        }
    }

    Resolution::NotFound
}
