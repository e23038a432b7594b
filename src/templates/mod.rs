//! Page templates loaded from `_template/<name>.html`
//!
//! Templates are compiled with Tera on first use and memoized. An entry is
//! reused while its recorded modification time is not older than the file's
//! current one; a newer file is recompiled on the next [`TemplateCache::get`].
//! Nothing watches the directory.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tera::{Context, Tera};

use crate::error::TemplateError;

/// A compiled page template
pub struct CompiledTemplate {
    name: String,
    tera: Tera,
}

impl CompiledTemplate {
    /// Compile template source
    pub fn compile(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        // Content, title and toc are already HTML
        tera.autoescape_on(vec![]);

        tera.add_raw_template(name, source)
            .map_err(|source| TemplateError::Compile {
                name: name.to_string(),
                source,
            })?;

        Ok(Self {
            name: name.to_string(),
            tera,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with any serializable context
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, TemplateError> {
        let render_err = |source| TemplateError::Render {
            name: self.name.clone(),
            source,
        };
        let context = Context::from_serialize(data).map_err(render_err)?;
        self.tera.render(&self.name, &context).map_err(render_err)
    }
}

struct CacheEntry {
    template: Arc<CompiledTemplate>,
    mtime: SystemTime,
}

/// Memoizes compiled templates by name
pub struct TemplateCache {
    dir: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TemplateCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Source file for a template name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.html", name))
    }

    /// Get a compiled template, recompiling it if the file changed
    pub fn get(&self, name: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if !is_valid_name(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }

        let path = self.path_for(name);
        let mtime = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|_| TemplateError::NotFound(name.to_string()))?;

        if let Some(template) = self.fresh_entry(name, mtime) {
            tracing::debug!("Template cache hit: {}", name);
            return Ok(template);
        }

        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            name: name.to_string(),
            source,
        })?;
        let compiled = Arc::new(CompiledTemplate::compile(name, &source)?);

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        // Another request may have refreshed the entry while we compiled
        if let Some(entry) = entries.get(name) {
            if entry.mtime >= mtime {
                return Ok(Arc::clone(&entry.template));
            }
        }

        tracing::info!("Compiled template {:?}", path);
        entries.insert(
            name.to_string(),
            CacheEntry {
                template: Arc::clone(&compiled),
                mtime,
            },
        );

        Ok(compiled)
    }

    /// Drop a cached entry
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_entry(&self, name: &str, mtime: SystemTime) -> Option<Arc<CompiledTemplate>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(name)
            .filter(|entry| entry.mtime >= mtime)
            .map(|entry| Arc::clone(&entry.template))
    }
}

/// Names map to a single file inside the template directory
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}
