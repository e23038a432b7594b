//! Content module - document splitting, Markdown rendering, page composition

mod frontmatter;
mod markdown;
mod page;

pub use frontmatter::{split, FrontMatter, DEFAULT_TEMPLATE};
pub use markdown::{MarkdownRenderer, Rendered};
pub use page::{render_page, PageContext, EDIT_LINK};
