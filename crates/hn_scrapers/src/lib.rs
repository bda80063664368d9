pub mod cli;
pub mod logging;
pub mod pipeline;
pub mod scrapers;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use logging::init_logging;
pub use pipeline::IngestPipeline;
pub use scrapers::{Extraction, FetchConfig, HackerNewsScraper, Scraper, Selectors};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use super::pipeline::IngestPipeline;
    pub use hn_core::{Error, Post, Result};
}
