use serde::{Deserialize, Serialize};

use crate::text::WordCounts;

/// A post as extracted from a listing page, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub description: String,
    pub image_source: String,
    pub url: String,
}

/// One listing page: its posts in page order and the link to the older posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub posts: Vec<Post>,
    pub next_page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub description: String,
    pub image: String,
    pub titles: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralizedDescription {
    pub id: i64,
    pub description: String,
    pub article_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub id: i64,
    /// JSON object of word to count, highest count first.
    pub payload: String,
    pub generalized_description_id: i64,
}

/// Everything the pipeline writes for one post, prior to id assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticleRecord {
    pub post: Post,
    pub generalized_description: String,
    pub word_count_payload: String,
}

/// Rows written for one post, with their generated ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    pub article: Article,
    pub generalized_description: GeneralizedDescription,
    pub word_count: WordCount,
}

/// An article joined with its derived rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetail {
    pub article: Article,
    pub generalized_description: Option<GeneralizedDescription>,
    pub word_counts: Option<WordCounts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleUrl {
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub articles: u64,
    pub generalized_descriptions: u64,
    pub word_counts: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub count: usize,
    pub pages: usize,
}

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
}

/// Account fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone_number) = &self.phone_number {
            user.phone_number = Some(phone_number.clone());
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
    }
}

/// Exact-match account lookup. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserFilter {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.name.as_ref().map_or(true, |name| &user.name == name)
            && self
                .phone_number
                .as_ref()
                .map_or(true, |phone| user.phone_number.as_ref() == Some(phone))
    }
}
