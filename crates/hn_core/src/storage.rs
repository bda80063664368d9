use async_trait::async_trait;
use crate::types::{
    Article, ArticleDetail, ArticleUrl, NewArticleRecord, NewUser, RowCounts, StoredRecord, User,
    UserChanges, UserFilter,
};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Store an article with its generalized description and word counts.
    ///
    /// All three rows are written in a single transaction: either the whole
    /// record lands or none of it does.
    async fn store_post(&self, record: &NewArticleRecord) -> Result<StoredRecord>;

    /// All stored articles in insertion order. Fails with `NotFound` when empty.
    async fn list_articles(&self) -> Result<Vec<Article>>;

    /// An article joined with its generalized description and word counts.
    async fn get_article(&self, id: i64) -> Result<ArticleDetail>;

    /// URLs of articles whose raw description contains `keyword`, ignoring case.
    /// Fails with `NotFound` when nothing matches.
    async fn search_descriptions(&self, keyword: &str) -> Result<Vec<ArticleUrl>>;

    /// Delete an article and, by cascade, everything derived from it.
    async fn delete_article(&self, id: i64) -> Result<()>;

    /// Delete a generalized description and its word counts.
    async fn delete_generalized_description(&self, id: i64) -> Result<()>;

    async fn count_rows(&self) -> Result<RowCounts>;
}

pub const EMAIL_TAKEN: &str = "User with this email already exists";
pub const PHONE_TAKEN: &str = "User with this phone number already exists";

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Fails with `Conflict` when the email or phone number belongs to
    /// another account.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// Accounts matching `filter`, by id. Fails with `NotFound` when none do.
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

    async fn get_user(&self, id: i64) -> Result<User>;

    /// The account registered with `email`, or else with `phone_number`.
    async fn find_login(&self, email: Option<&str>, phone_number: Option<&str>)
        -> Result<Option<User>>;

    /// Same uniqueness rules as `create_user`.
    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User>;

    async fn delete_user(&self, id: i64) -> Result<()>;
}
