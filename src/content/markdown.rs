//! Markdown rendering with syntax highlighting and a table of contents

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::MarkdownSettings;

/// Output of [`MarkdownRenderer::render`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Body HTML
    pub content: String,
    /// Nested `<ul>` linking to every heading, empty without headings
    pub toc: String,
}

/// A heading collected while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
struct TocEntry {
    level: u8,
    id: String,
    title: String,
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_settings(&MarkdownSettings::default())
    }

    /// Create from the `markdown` section of the site config
    pub fn with_settings(settings: &MarkdownSettings) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: settings.highlight_theme.clone(),
            line_numbers: settings.line_numbers,
        }
    }

    /// Render a document body to HTML plus its table of contents
    pub fn render(&self, markdown: &str) -> Rendered {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut toc: Vec<TocEntry> = Vec::new();
        let mut used_ids: HashSet<String> = HashSet::new();

        let mut heading_start: Option<usize> = None;
        let mut heading_text = String::new();

        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        let mut in_script = false;
        let mut link_depth = 0usize;

        for event in parser {
            if heading_start.is_some() {
                if let Event::Text(text) | Event::Code(text) = &event {
                    heading_text.push_str(text);
                }
            }

            // Everything between <script> and </script> is dropped
            if in_script {
                match &event {
                    Event::Html(raw) | Event::InlineHtml(raw) => {
                        if raw.to_ascii_lowercase().contains("</script") {
                            in_script = false;
                        }
                        continue;
                    }
                    Event::Text(_) | Event::SoftBreak | Event::HardBreak => continue,
                    _ => {}
                }
            }

            match event {
                Event::Start(Tag::Heading { .. }) => {
                    heading_start = Some(events.len());
                    heading_text.clear();
                    events.push(event);
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(idx) = heading_start.take() {
                        if let Event::Start(Tag::Heading { id, .. }) = &mut events[idx] {
                            let anchor = match id.as_deref() {
                                Some(explicit) => {
                                    used_ids.insert(explicit.to_string());
                                    explicit.to_string()
                                }
                                None => unique_id(&mut used_ids, &heading_text),
                            };
                            *id = Some(CowStr::from(anchor.clone()));
                            toc.push(TocEntry {
                                level: level as u8,
                                id: anchor,
                                title: heading_text.trim().to_string(),
                            });
                        }
                    }
                    events.push(event);
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            let lang = lang.to_string();
                            if lang.is_empty() {
                                None
                            } else {
                                Some(lang)
                            }
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                    link_depth += 1;
                    events.push(event);
                }
                Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(event);
                }
                Event::Text(text) if link_depth == 0 => match autolink(&text) {
                    Some(linked) => events.push(Event::InlineHtml(CowStr::from(linked))),
                    None => events.push(Event::Text(text)),
                },
                Event::Html(raw) | Event::InlineHtml(raw) if is_script_open(&raw) => {
                    in_script = !raw.to_ascii_lowercase().contains("</script");
                }
                _ => {
                    if !in_code_block {
                        events.push(event);
                    }
                }
            }
        }

        let mut content = String::new();
        html::push_html(&mut content, events.into_iter());

        Rendered {
            content,
            toc: toc_html(&toc),
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(code, &highlighted, lang),
            Some(highlighted) => highlighted,
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                html_escape(code)
            ),
        }
    }

    /// Put a line number gutter next to highlighted code
    fn add_line_numbers(&self, code: &str, highlighted: &str, lang: &str) -> String {
        let gutter = (1..=code.lines().count().max(1))
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            lang, gutter, highlighted
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_script_open(raw: &str) -> bool {
    raw.trim_start().to_ascii_lowercase().starts_with("<script")
}

/// Link bare `http://` and `https://` URLs in a text run. `None` when the
/// text has no URL to link.
fn autolink(text: &str) -> Option<String> {
    let mut out = String::new();
    let mut rest = text;
    let mut linked = false;

    while let Some(start) = ["https://", "http://"]
        .iter()
        .filter_map(|scheme| rest.find(scheme))
        .min()
    {
        let tail = &rest[start..];
        let scheme_len = if tail.starts_with("https://") { 8 } else { 7 };
        let end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(tail.len());
        // Trailing punctuation belongs to the sentence
        let url = tail[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);

        out.push_str(&html_escape(&rest[..start]));
        if url.len() > scheme_len {
            rest = &tail[url.len()..];
            let url = html_escape(url);
            out.push_str(&format!(r#"<a href="{}">{}</a>"#, url, url));
            linked = true;
        } else {
            out.push_str(&html_escape(&tail[..scheme_len]));
            rest = &tail[scheme_len..];
        }
    }

    if !linked {
        return None;
    }
    out.push_str(&html_escape(rest));
    Some(out)
}

/// Slug for a heading, suffixed until it is unused
fn unique_id(used: &mut HashSet<String>, text: &str) -> String {
    let mut base = slug::slugify(text);
    if base.is_empty() {
        base = "section".to_string();
    }

    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Build a nested list from headings in document order
fn toc_html(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let mut levels: Vec<u8> = Vec::new();

    for entry in entries {
        match levels.last().copied() {
            None => {
                out.push_str("<ul>\n<li>");
                levels.push(entry.level);
            }
            Some(top) if entry.level > top => {
                out.push_str("\n<ul>\n<li>");
                levels.push(entry.level);
            }
            Some(_) => {
                while levels.len() > 1 && levels.last().is_some_and(|&top| entry.level < top) {
                    out.push_str("</li>\n</ul>");
                    levels.pop();
                }
                out.push_str("</li>\n<li>");
            }
        }
        out.push_str(&format!(
            r##"<a href="#{}">{}</a>"##,
            entry.id,
            html_escape(&entry.title)
        ));
    }

    for _ in levels {
        out.push_str("</li>\n</ul>");
    }
    out.push('\n');
    out
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading_and_paragraph() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Hello World\n\nThis is a test.");
        assert!(out.content.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(out.content.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_toc_nesting() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# One\n## Two\n### Three\n## Four\n# Five\n");
        assert_eq!(
            out.toc,
            "<ul>\n<li><a href=\"#one\">One</a>\
             \n<ul>\n<li><a href=\"#two\">Two</a>\
             \n<ul>\n<li><a href=\"#three\">Three</a></li>\n</ul>\
             </li>\n<li><a href=\"#four\">Four</a></li>\n</ul>\
             </li>\n<li><a href=\"#five\">Five</a></li>\n</ul>\n"
        );
    }

    #[test]
    fn test_no_headings_no_toc() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("plain text");
        assert_eq!(out.toc, "");
    }

    #[test]
    fn test_duplicate_and_explicit_ids() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Setup\n## Setup\n## Custom {#mine}\n");
        assert!(out.content.contains(r#"id="setup""#));
        assert!(out.content.contains(r#"id="setup-1""#));
        assert!(out.content.contains(r#"id="mine""#));
        assert!(out.toc.contains("#setup-1"));
        assert!(out.toc.contains(r##"<a href="#mine">Custom</a>"##));
    }

    #[test]
    fn test_heading_with_inline_code_in_toc() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Using `cargo` <b>\n");
        assert!(out.toc.contains("Using cargo"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```rust\nfn main() {}\n```");
        assert!(out.content.contains("<pre"));
        assert!(out.content.contains("main"));
        assert!(!out.content.contains("```"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_settings(&MarkdownSettings {
            line_numbers: true,
            ..Default::default()
        });
        let out = renderer.render("```\na\nb\n```");
        assert!(out.content.contains(r#"<span class="line-number">2</span>"#));
    }

    #[test]
    fn test_script_blocks_dropped() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("before\n\n<script>\nalert(1)\n</script>\n\nafter");
        assert!(!out.content.contains("<script"));
        assert!(!out.content.contains("alert"));
        assert!(out.content.contains("before"));
        assert!(out.content.contains("after"));

        let inline = renderer.render("text <script>alert(2)</script> more");
        assert!(!inline.content.contains("alert"));
        assert!(inline.content.contains("more"));
    }

    #[test]
    fn test_other_html_kept() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("<div class=\"note\">hi</div>\n");
        assert!(out.content.contains("<div class=\"note\">"));
    }

    #[test]
    fn test_bare_urls_autolinked() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render(
            "See https://example.com/docs. Or <https://rust-lang.org>.\n\n[named](https://a.test) and `https://code.test`",
        );
        assert!(out
            .content
            .contains(r#"See <a href="https://example.com/docs">https://example.com/docs</a>. Or "#));
        assert!(out
            .content
            .contains(r#"<a href="https://rust-lang.org">https://rust-lang.org</a>"#));
        assert!(out.content.contains(r#"<a href="https://a.test">named</a>"#));
        assert!(out.content.contains("<code>https://code.test</code>"));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(autolink("no links here"), None);
        assert_eq!(autolink("just https:// alone"), None);
        assert_eq!(
            autolink("a <b> http://x.io, c").as_deref(),
            Some(r#"a &lt;b&gt; <a href="http://x.io">http://x.io</a>, c"#)
        );
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(out.content.contains("<table>"));
        assert!(out.content.contains("<del>gone</del>"));
    }
}
