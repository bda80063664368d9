use async_trait::async_trait;
use hn_core::{Error, Page, Result};
use std::time::Duration;
use tracing::{debug, warn};

use super::{utils, Extraction, PageExtractor, Scraper, Selectors};

/// HTTP behavior for page fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout, connection and body included.
    pub timeout: Duration,
    /// Extra attempts after a failed fetch. Malformed pages are never retried.
    pub retries: u32,
    /// Delay before the first retry; doubled on each further attempt.
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
            user_agent: concat!("hn_digest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Scrapes the paginated front page of The Hacker News.
#[derive(Debug)]
pub struct HackerNewsScraper {
    client: reqwest::Client,
    extractor: PageExtractor,
    config: FetchConfig,
    start_url: String,
}

impl HackerNewsScraper {
    pub const BASE_URL: &'static str = "https://thehackernews.com/";

    pub fn new() -> Result<Self> {
        Self::with_config(
            Self::BASE_URL,
            FetchConfig::default(),
            &Selectors::default(),
            Extraction::default(),
        )
    }

    pub fn with_config(
        start_url: &str,
        config: FetchConfig,
        selectors: &Selectors,
        extraction: Extraction,
    ) -> Result<Self> {
        utils::parse_url(start_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::InvalidArgument(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            extractor: PageExtractor::new(selectors, extraction)?,
            config,
            start_url: start_url.to_string(),
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| Error::fetch(url, e))
    }

    async fn fetch_html_with_retry(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.fetch_html(url).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    let delay = self.config.retry_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "Fetch failed, retrying {}/{} in {:?}: {}",
                        attempt, self.config.retries, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Scraper for HackerNewsScraper {
    fn source(&self) -> &str {
        "The Hacker News"
    }

    /// The Hacker News itself, any of its subdomains, or the host of the
    /// configured start URL.
    fn can_handle(&self, url: &str) -> bool {
        let host = |url: &str| {
            utils::parse_url(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        };
        match host(url) {
            Some(h) => {
                h == "thehackernews.com"
                    || h.ends_with(".thehackernews.com")
                    || host(&self.start_url).as_deref() == Some(h.as_str())
            }
            None => false,
        }
    }

    fn start_url(&self) -> &str {
        &self.start_url
    }

    async fn fetch_page(&self, url: &str) -> Result<Page> {
        let html = self.fetch_html_with_retry(url).await?;
        let page = self.extractor.extract(&html, url)?;
        debug!(
            "Extracted {} posts from {} (next: {:?})",
            page.posts.len(),
            url,
            page.next_page_url
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"
        <html><body>
          <div class="body-post clear">
            <a class="story-link" href="/2024/05/botnet.html">
              <img class="home-img-src lazyload" data-src="https://img/1.jpg" src="data:,"/>
              <h2 class="home-title">New Botnet</h2>
              <div class="home-desc">A botnet targets Kubernetes.</div>
            </a>
          </div>
          <a class="blog-pager-older-link-mobile" href="/older">Next Page</a>
        </body></html>
    "#;

    fn fast_config() -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(5),
            retries: 2,
            retry_delay: Duration::from_millis(10),
            ..FetchConfig::default()
        }
    }

    fn scraper_for(server: &MockServer) -> HackerNewsScraper {
        HackerNewsScraper::with_config(
            &server.uri(),
            fast_config(),
            &Selectors::default(),
            Extraction::Cards,
        )
        .unwrap()
    }

    #[test]
    fn test_can_handle() {
        let scraper = HackerNewsScraper::new().unwrap();
        assert!(scraper.can_handle("https://thehackernews.com/2024/05/x.html"));
        assert!(scraper.can_handle("https://www.thehackernews.com/"));
        assert!(!scraper.can_handle("https://news.ycombinator.com/"));
        assert!(!scraper.can_handle("not a url"));
    }

    #[tokio::test]
    async fn test_can_handle_configured_host() {
        let server = MockServer::start().await;
        let scraper = scraper_for(&server);
        assert!(scraper.can_handle(&format!("{}/older", server.uri())));
        assert!(scraper.can_handle("https://thehackernews.com/"));
        assert!(!scraper.can_handle("https://news.ycombinator.com/"));
    }

    #[test]
    fn test_rejects_invalid_start_url() {
        let result = HackerNewsScraper::with_config(
            "not a url",
            FetchConfig::default(),
            &Selectors::default(),
            Extraction::Cards,
        );
        assert!(matches!(result.unwrap_err(), Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let scraper = scraper_for(&server);
        let page = scraper.fetch_page(&format!("{}/", server.uri())).await.unwrap();

        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].image_source, "https://img/1.jpg");
        assert_eq!(page.posts[0].url, format!("{}/2024/05/botnet.html", server.uri()));
        assert_eq!(page.next_page_url, Some(format!("{}/older", server.uri())));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let scraper = scraper_for(&server);
        let err = scraper.fetch_page(&server.uri()).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let scraper = scraper_for(&server);
        let page = scraper.fetch_page(&server.uri()).await.unwrap();
        assert_eq!(page.posts[0].title, "New Botnet");
    }

    #[tokio::test]
    async fn test_malformed_page_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let scraper = scraper_for(&server);
        let err = scraper.fetch_page(&server.uri()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedPage { .. }));
    }
}
