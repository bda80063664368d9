//! Turns a listing page into [`Post`] records.
//!
//! Two layouts are understood:
//!
//! - [`Extraction::Cards`] (default): every post lives in one container
//!   element and all four fields are read from inside it, so a field can never
//!   be paired with the wrong post.
//! - [`Extraction::Parallel`]: titles, descriptions, images and links are four
//!   separate lists on the page, matched by position. The lists must have the
//!   same length, otherwise the page is rejected.

use hn_core::{Error, Page, Post, Result};
use scraper::{ElementRef, Html, Selector};

use super::utils;

/// CSS selectors describing where posts live on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    pub card: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub next_page: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            card: ".body-post".to_string(),
            title: ".home-title".to_string(),
            description: ".home-desc".to_string(),
            image: ".home-img-src".to_string(),
            link: "a.story-link".to_string(),
            next_page: ".blog-pager-older-link-mobile".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Extraction {
    #[default]
    Cards,
    Parallel,
}

#[derive(Debug)]
struct Compiled {
    card: Selector,
    title: Selector,
    description: Selector,
    image: Selector,
    link: Selector,
    next_page: Selector,
}

#[derive(Debug)]
pub struct PageExtractor {
    selectors: Compiled,
    mode: Extraction,
}

impl PageExtractor {
    pub fn new(selectors: &Selectors, mode: Extraction) -> Result<Self> {
        Ok(Self {
            selectors: Compiled {
                card: utils::parse_selector(&selectors.card)?,
                title: utils::parse_selector(&selectors.title)?,
                description: utils::parse_selector(&selectors.description)?,
                image: utils::parse_selector(&selectors.image)?,
                link: utils::parse_selector(&selectors.link)?,
                next_page: utils::parse_selector(&selectors.next_page)?,
            },
            mode,
        })
    }

    pub fn mode(&self) -> Extraction {
        self.mode
    }

    /// Extracts the posts of one page, in page order, plus the link to the
    /// next (older) page if there is one. Relative links are resolved against
    /// `page_url`.
    pub fn extract(&self, html: &str, page_url: &str) -> Result<Page> {
        let document = Html::parse_document(html);

        let posts = match self.mode {
            Extraction::Cards => self.extract_cards(&document, page_url)?,
            Extraction::Parallel => self.extract_parallel(&document, page_url)?,
        };
        if posts.is_empty() {
            return Err(Error::malformed(page_url, "no posts found"));
        }

        let next_page_url = document
            .select(&self.selectors.next_page)
            .next()
            .and_then(|el| el.value().attr("href"))
            .filter(|href| !href.trim().is_empty())
            .map(|href| utils::resolve_url(page_url, href.trim()));

        Ok(Page {
            posts,
            next_page_url,
        })
    }

    fn extract_cards(&self, document: &Html, page_url: &str) -> Result<Vec<Post>> {
        let s = &self.selectors;
        document
            .select(&s.card)
            .enumerate()
            .map(|(i, card)| {
                let missing = |field: &str| {
                    Error::malformed(page_url, format!("post {} has no {}", i + 1, field))
                };
                let title = utils::first_within(card, &s.title).ok_or_else(|| missing("title"))?;
                let description = utils::first_within(card, &s.description)
                    .ok_or_else(|| missing("description"))?;
                let image = utils::first_within(card, &s.image).ok_or_else(|| missing("image"))?;
                let link = utils::first_within(card, &s.link).ok_or_else(|| missing("link"))?;

                build_post(title, description, image, link, page_url)
                    .ok_or_else(|| missing("image source or link target"))
            })
            .collect()
    }

    fn extract_parallel(&self, document: &Html, page_url: &str) -> Result<Vec<Post>> {
        let s = &self.selectors;
        let titles: Vec<_> = document.select(&s.title).collect();
        let descriptions: Vec<_> = document.select(&s.description).collect();
        let images: Vec<_> = document.select(&s.image).collect();
        let links: Vec<_> = document.select(&s.link).collect();

        let n = titles.len();
        if descriptions.len() != n || images.len() != n || links.len() != n {
            return Err(Error::malformed(
                page_url,
                format!(
                    "post lists differ in length: {} titles, {} descriptions, {} images, {} links",
                    n,
                    descriptions.len(),
                    images.len(),
                    links.len()
                ),
            ));
        }

        titles
            .into_iter()
            .zip(descriptions)
            .zip(images)
            .zip(links)
            .enumerate()
            .map(|(i, (((title, description), image), link))| {
                build_post(title, description, image, link, page_url).ok_or_else(|| {
                    Error::malformed(
                        page_url,
                        format!("post {} has no image source or link target", i + 1),
                    )
                })
            })
            .collect()
    }
}

fn build_post(
    title: ElementRef,
    description: ElementRef,
    image: ElementRef,
    link: ElementRef,
    page_url: &str,
) -> Option<Post> {
    let image_source = utils::image_source(image)?;
    let href = utils::non_empty_attr(link, "href")?;
    Some(Post {
        title: utils::element_text(title),
        description: utils::element_text(description),
        image_source: image_source.to_string(),
        url: utils::resolve_url(page_url, href),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://thehackernews.com/";

    fn card(slug: &str, title: &str, description: &str, image_attrs: &str) -> String {
        format!(
            r#"
            <div class="body-post clear">
              <a class="story-link" href="https://thehackernews.com/2024/05/{slug}.html">
                <div class="clear home-post-box cf">
                  <div class="home-img clear">
                    <img class="home-img-src lazyload" {image_attrs} alt="{title}"/>
                  </div>
                  <div class="clear home-right">
                    <h2 class="home-title">{title}</h2>
                    <div class="home-desc"> {description} </div>
                  </div>
                </div>
              </a>
            </div>
            "#
        )
    }

    fn listing(cards: &[String], older: Option<&str>) -> String {
        let pager = older
            .map(|href| format!(r#"<a class="blog-pager-older-link-mobile" href="{}">Next</a>"#, href))
            .unwrap_or_default();
        format!("<html><body><div class=\"blog-posts\">{}</div>{}</body></html>", cards.join("\n"), pager)
    }

    fn extractor(mode: Extraction) -> PageExtractor {
        PageExtractor::new(&Selectors::default(), mode).unwrap()
    }

    #[test]
    fn test_extract_cards() {
        let html = listing(
            &[
                card("botnet", "New Botnet Spotted", "A botnet targets routers.", r#"data-src="https://img/1.jpg" src="data:image/gif""#),
                card("patch", "Chrome Patch", "Google fixes a zero-day.", r#"src="https://img/2.jpg""#),
            ],
            Some("https://thehackernews.com/search?updated-max=2024-05-01&max-results=12"),
        );

        let page = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap();
        assert_eq!(page.posts.len(), 2);
        assert_eq!(
            page.posts[0],
            Post {
                title: "New Botnet Spotted".to_string(),
                description: "A botnet targets routers.".to_string(),
                image_source: "https://img/1.jpg".to_string(),
                url: "https://thehackernews.com/2024/05/botnet.html".to_string(),
            }
        );
        assert_eq!(page.posts[1].image_source, "https://img/2.jpg");
        assert_eq!(
            page.next_page_url.as_deref(),
            Some("https://thehackernews.com/search?updated-max=2024-05-01&max-results=12")
        );
    }

    #[test]
    fn test_missing_next_link() {
        let html = listing(&[card("a", "A", "desc", r#"src="https://img/a.jpg""#)], None);
        let page = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap();
        assert!(page.next_page_url.is_none());
    }

    #[test]
    fn test_relative_next_link_is_resolved() {
        let html = listing(&[card("a", "A", "desc", r#"src="/img/a.jpg""#)], Some("/search?page=2"));
        let page = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap();
        assert_eq!(
            page.next_page_url.as_deref(),
            Some("https://thehackernews.com/search?page=2")
        );
    }

    #[test]
    fn test_card_without_description_is_malformed() {
        let broken = r#"
            <div class="body-post">
              <a class="story-link" href="https://thehackernews.com/x.html">
                <img class="home-img-src" src="https://img/x.jpg"/>
                <h2 class="home-title">Only a title</h2>
              </a>
            </div>"#
            .to_string();
        let html = listing(&[card("a", "A", "desc", r#"src="https://img/a.jpg""#), broken], None);

        let err = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap_err();
        match err {
            Error::MalformedPage { reason, .. } => assert_eq!(reason, "post 2 has no description"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_image_without_source_is_malformed() {
        let html = listing(&[card("a", "A", "desc", "")], None);
        let err = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap_err();
        assert!(matches!(err, Error::MalformedPage { .. }));
    }

    #[test]
    fn test_page_without_posts_is_malformed() {
        let html = listing(&[], Some("/older"));
        let err = extractor(Extraction::Cards).extract(&html, PAGE_URL).unwrap_err();
        assert!(matches!(err, Error::MalformedPage { .. }));
    }

    #[test]
    fn test_parallel_lists() {
        let html = listing(
            &[
                card("a", "A", "first", r#"data-src="https://img/a.jpg""#),
                card("b", "B", "second", r#"src="https://img/b.jpg""#),
            ],
            None,
        );
        let page = extractor(Extraction::Parallel).extract(&html, PAGE_URL).unwrap();
        let titles: Vec<_> = page.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(page.posts[1].description, "second");
    }

    #[test]
    fn test_parallel_length_mismatch_fails_fast() {
        let html = r#"
            <h2 class="home-title">A</h2><h2 class="home-title">B</h2>
            <div class="home-desc">only one</div>
            <img class="home-img-src" src="https://img/a.jpg"/><img class="home-img-src" src="https://img/b.jpg"/>
            <a class="story-link" href="/a">a</a><a class="story-link" href="/b">b</a>
        "#;
        let err = extractor(Extraction::Parallel).extract(html, PAGE_URL).unwrap_err();
        match err {
            Error::MalformedPage { reason, .. } => {
                assert!(reason.contains("2 titles, 1 descriptions"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_selector() {
        let selectors = Selectors {
            card: "..broken[".to_string(),
            ..Selectors::default()
        };
        assert!(PageExtractor::new(&selectors, Extraction::Cards).is_err());
    }
}
