use hn_core::{
    count_words, Article, ArticleDetail, ArticleStorage, ArticleUrl, Error, Generalizer,
    IngestResult, NewArticleRecord, Post, Result,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::scrapers::Scraper;

/// Fetches listing pages and turns every post into an article, a generalized
/// description and its word counts.
///
/// Each post is persisted in its own transaction as soon as its page has been
/// fetched. A failure part-way through leaves every earlier post in place.
pub struct IngestPipeline {
    storage: Arc<dyn ArticleStorage>,
    scraper: Arc<dyn Scraper>,
    generalizer: Generalizer,
}

impl IngestPipeline {
    pub fn new(storage: Arc<dyn ArticleStorage>, scraper: Arc<dyn Scraper>) -> Self {
        Self {
            storage,
            scraper,
            generalizer: Generalizer::default(),
        }
    }

    pub fn with_generalizer(mut self, generalizer: Generalizer) -> Self {
        self.generalizer = generalizer;
        self
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    pub fn scraper(&self) -> &Arc<dyn Scraper> {
        &self.scraper
    }

    /// Derives the rows stored for one post.
    pub fn prepare(&self, post: Post) -> Result<NewArticleRecord> {
        let generalized_description = self.generalizer.generalize(&post.description);
        let word_count_payload = count_words(&generalized_description).to_json()?;
        Ok(NewArticleRecord {
            post,
            generalized_description,
            word_count_payload,
        })
    }

    /// Ingests up to `page_count` pages starting at the scraper's start URL.
    pub async fn ingest_latest(&self, page_count: usize) -> Result<IngestResult> {
        let start_url = self.scraper.start_url().to_string();
        self.ingest(&start_url, page_count).await
    }

    /// Ingests up to `page_count` listing pages, following the older-posts
    /// link from `start_url`.
    ///
    /// Stops early, successfully, when a page has no older-posts link.
    pub async fn ingest(&self, start_url: &str, page_count: usize) -> Result<IngestResult> {
        if page_count == 0 {
            return Err(Error::InvalidArgument(
                "page count must be a positive integer".to_string(),
            ));
        }
        if !self.scraper.can_handle(start_url) {
            return Err(Error::InvalidArgument(format!(
                "{} scraper cannot handle {}",
                self.scraper.source(),
                start_url
            )));
        }

        let mut result = IngestResult::default();
        let mut page_url = start_url.to_string();

        for page_number in 1..=page_count {
            info!("🦗 Fetching page {}/{} from {}", page_number, page_count, page_url);
            let page = self
                .scraper
                .fetch_page(&page_url)
                .await
                .map_err(|e| self.interrupted(&result, e))?;
            result.pages += 1;

            for post in page.posts {
                let record = self.prepare(post).map_err(|e| self.interrupted(&result, e))?;
                let stored = self
                    .storage
                    .store_post(&record)
                    .await
                    .map_err(|e| self.interrupted(&result, e))?;
                debug!(
                    "💾 Stored article {} ({})",
                    stored.article.id, stored.article.url
                );
                result.count += 1;
            }

            match page.next_page_url {
                Some(next) => page_url = next,
                None => {
                    if page_number < page_count {
                        warn!(
                            "No older posts after {}, stopping at page {} of {}",
                            page_url, page_number, page_count
                        );
                    }
                    break;
                }
            }
        }

        info!("✅ Ingested {} articles from {} pages", result.count, result.pages);
        Ok(result)
    }

    fn interrupted(&self, result: &IngestResult, error: Error) -> Error {
        warn!(
            "⚠️ Ingestion from {} interrupted after {} articles on {} pages: {}",
            self.scraper.source(),
            result.count,
            result.pages,
            error
        );
        error
    }

    /// Links of articles whose description contains `keyword`, ignoring case.
    pub async fn search(&self, keyword: &str) -> Result<Vec<ArticleUrl>> {
        if keyword.trim().is_empty() {
            return Err(Error::InvalidArgument("keyword must not be empty".to_string()));
        }
        self.storage.search_descriptions(keyword).await
    }

    pub async fn list(&self) -> Result<Vec<Article>> {
        self.storage.list_articles().await
    }

    pub async fn article(&self, id: i64) -> Result<ArticleDetail> {
        self.storage.get_article(id).await
    }

    pub async fn delete_article(&self, id: i64) -> Result<()> {
        self.storage.delete_article(id).await
    }
}
