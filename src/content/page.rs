//! Page composition: document + config + template

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::{FrontMatter, Rendered};
use crate::config::Config;
use crate::error::WikiError;
use crate::Wiki;

/// Query string that opens the editor for the current page
pub const EDIT_LINK: &str = "?edit=1";

/// Data handed to a page template.
///
/// Field names are the ones templates use: `{{ Title }}`, `{{ Config.x }}`,
/// `{{ Page.Author }}` and so on.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageContext<'a> {
    pub config: &'a Config,
    pub title: &'a str,
    pub content: String,
    pub toc: String,
    pub page: &'a FrontMatter,
    pub source_link: String,
    pub edit_link: &'static str,
}

impl<'a> PageContext<'a> {
    pub fn new(
        config: &'a Config,
        url_path: &str,
        front_matter: &'a FrontMatter,
        rendered: Rendered,
    ) -> Self {
        Self {
            config,
            title: front_matter.title(),
            content: rendered.content,
            toc: rendered.toc,
            page: front_matter,
            source_link: format!("{}.md", url_path),
            edit_link: EDIT_LINK,
        }
    }
}

/// Render the Markdown document at `file` for the request path `url_path`.
///
/// The file is read fresh on every call.
pub fn render_page(wiki: &Wiki, url_path: &str, file: &Path) -> Result<String, WikiError> {
    let bytes = fs::read(file)?;
    let text = String::from_utf8_lossy(&bytes);

    let (front_matter, body) = FrontMatter::parse(&text);
    let rendered = wiki.renderer().render(body);

    let template = wiki.templates().get(front_matter.template())?;
    let config = wiki.config().snapshot();
    let context = PageContext::new(&config, url_path, &front_matter, rendered);

    Ok(template.render(&context)?)
}
