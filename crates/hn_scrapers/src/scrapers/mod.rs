use async_trait::async_trait;
use hn_core::{Error, Page, Result};

pub mod extract;
pub mod hackernews;

pub use extract::{Extraction, PageExtractor, Selectors};
pub use hackernews::{FetchConfig, HackerNewsScraper};

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the news source
    fn source(&self) -> &str;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// The first listing page to ingest from
    fn start_url(&self) -> &str;

    /// Fetches one listing page and extracts its posts and the older-posts link
    async fn fetch_page(&self, url: &str) -> Result<Page>;
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use scraper::{ElementRef, Selector};
    use url::Url;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| Error::InvalidArgument(format!("Invalid selector {:?}: {}", selector, e)))
    }

    /// `href` joined onto `base`; left untouched when either does not parse.
    pub fn resolve_url(base: &str, href: &str) -> String {
        parse_url(base)
            .ok()
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string())
    }

    /// First element matching `selector`, the scope element itself included.
    pub fn first_within<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
        if selector.matches(&scope) {
            return Some(scope);
        }
        scope.select(selector).next()
    }

    pub fn element_text(element: ElementRef) -> String {
        element.text().collect::<String>().trim().to_string()
    }

    pub fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Lazy-loaded images keep the real source in `data-src`; `src` then only
    /// holds a placeholder.
    pub fn image_source(image: ElementRef) -> Option<&str> {
        non_empty_attr(image, "data-src").or_else(|| non_empty_attr(image, "src"))
    }
}
