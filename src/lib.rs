//! mdwiki-rs: a file-backed Markdown wiki server
//!
//! Every URL path maps to a static file, a directory, or a Markdown document
//! under `_doc/`. Documents carry a YAML metadata block, are rendered through
//! Tera templates in `_template/`, and can be edited in the browser. The
//! global `config.yaml` is reloaded in the background while serving.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod templates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{ConfigStore, MarkdownSettings};
use content::MarkdownRenderer;
use error::ConfigError;
use templates::TemplateCache;

/// Global configuration file, relative to the base directory
pub const CONFIG_FILE: &str = "config.yaml";
/// Document root
pub const DOC_DIR: &str = "_doc";
/// Page templates
pub const TEMPLATE_DIR: &str = "_template";
/// Assets served under `/_static/`
pub const STATIC_DIR: &str = "_static";
/// Editor shell, inside the template directory
pub const EDITOR_FILE: &str = "_edit.html";

/// The wiki application state, built once at startup and shared by every
/// request and the config poller.
pub struct Wiki {
    /// Base directory
    pub base_dir: PathBuf,
    /// Document root
    pub doc_dir: PathBuf,
    /// Template directory
    pub template_dir: PathBuf,
    /// Static asset directory
    pub static_dir: PathBuf,
    config: Arc<ConfigStore>,
    templates: TemplateCache,
    renderer: MarkdownRenderer,
}

impl Wiki {
    /// Load a wiki from a directory.
    ///
    /// Fails if `config.yaml` cannot be read or parsed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, ConfigError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = ConfigStore::load(base_dir.join(CONFIG_FILE))?;

        let settings: MarkdownSettings = config.snapshot().markdown();
        let template_dir = base_dir.join(TEMPLATE_DIR);

        Ok(Self {
            doc_dir: base_dir.join(DOC_DIR),
            templates: TemplateCache::new(&template_dir),
            template_dir,
            static_dir: base_dir.join(STATIC_DIR),
            config: Arc::new(config),
            renderer: MarkdownRenderer::with_settings(&settings),
            base_dir,
        })
    }

    /// Live configuration
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    pub fn renderer(&self) -> &MarkdownRenderer {
        &self.renderer
    }

    /// The editor shell served for `?edit=1`
    pub fn editor_path(&self) -> PathBuf {
        self.template_dir.join(EDITOR_FILE)
    }
}
