//! Initialize a new wiki

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::{CONFIG_FILE, DOC_DIR, EDITOR_FILE, STATIC_DIR, TEMPLATE_DIR};

const DEFAULT_CONFIG: &str = r#"# Wiki configuration
# Every key is available to templates as {{ Config.<key> }}.
# Changes are picked up while the server runs.

SiteName: My Wiki

markdown:
  line_numbers: false
  highlight_theme: InspiredGitHub
"#;

const SAMPLE_PAGE: &str = r#"Title: Welcome
---
# Welcome

This page lives in `_doc/index.md`. Open [the editor](?edit=1) to change it.

## Layout

- `_doc/` holds pages; `/notes/hello` renders `_doc/notes/hello.md`
- `_template/` holds page templates, picked with `Template:` in the header
- `_static/` is served under `/_static/`
"#;

const DEFAULT_TEMPLATE: &str = include_str!("scaffold/default.html");
const EDITOR: &str = include_str!("scaffold/_edit.html");
const STYLE: &str = include_str!("scaffold/style.css");

/// Initialize a wiki in the given directory. Existing files are kept.
pub fn init_site(target_dir: &Path) -> Result<()> {
    // Create directory structure
    fs::create_dir_all(target_dir.join(DOC_DIR))?;
    fs::create_dir_all(target_dir.join(TEMPLATE_DIR))?;
    fs::create_dir_all(target_dir.join(STATIC_DIR))?;

    let files = [
        (target_dir.join(CONFIG_FILE), DEFAULT_CONFIG),
        (target_dir.join(DOC_DIR).join("index.md"), SAMPLE_PAGE),
        (target_dir.join(TEMPLATE_DIR).join("default.html"), DEFAULT_TEMPLATE),
        (target_dir.join(TEMPLATE_DIR).join(EDITOR_FILE), EDITOR),
        (target_dir.join(STATIC_DIR).join("style.css"), STYLE),
    ];

    for (path, content) in files {
        if path.exists() {
            tracing::info!("Keeping existing {:?}", path);
            continue;
        }
        fs::write(&path, content)?;
        tracing::debug!("Created {:?}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::render_page;
    use crate::Wiki;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_servable_site() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();

        let wiki = Wiki::new(dir.path()).unwrap();
        assert!(wiki.editor_path().is_file());

        let page = dir.path().join("_doc/index.md");
        let html = render_page(&wiki, "/index", &page).unwrap();
        assert!(html.contains("<title>Welcome - My Wiki</title>"));
        assert!(html.contains("href=\"/index.md\""));
        assert!(html.contains("<nav class=\"toc\">"));
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "SiteName: Mine\n").unwrap();

        init_site(dir.path()).unwrap();
        let config = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, "SiteName: Mine\n");
    }
}
