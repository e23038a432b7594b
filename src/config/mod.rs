//! Configuration module

mod site;
mod store;

pub use site::{Config, MarkdownSettings};
pub(crate) use site::string_keyed;
pub use store::{ConfigPoller, ConfigStore, PollOutcome, CONFIG_POLL_INTERVAL};
