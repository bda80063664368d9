use async_trait::async_trait;
use hn_core::{
    contains_keyword, Article, ArticleDetail, ArticleStorage, ArticleUrl, Error,
    GeneralizedDescription, NewArticleRecord, NewUser, Result, RowCounts, StoredRecord, User,
    UserChanges, UserFilter, UserStorage, WordCount, WordCounts, EMAIL_TAKEN, PHONE_TAKEN,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::StorageBackend;

/// Tables kept in insertion order, each with its own id sequence starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    generalized_descriptions: Vec<GeneralizedDescription>,
    word_counts: Vec<WordCount>,
    users: Vec<User>,
    sequences: Sequences,
}

#[derive(Debug, Default)]
struct Sequences {
    article: i64,
    generalized_description: i64,
    word_count: i64,
    user: i64,
}

fn next(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

impl MemoryStore {
    pub fn store_post(&mut self, record: &NewArticleRecord) -> StoredRecord {
        let article = Article {
            id: next(&mut self.sequences.article),
            description: record.post.description.clone(),
            image: record.post.image_source.clone(),
            titles: record.post.title.clone(),
            url: record.post.url.clone(),
        };
        let generalized_description = GeneralizedDescription {
            id: next(&mut self.sequences.generalized_description),
            description: record.generalized_description.clone(),
            article_id: article.id,
        };
        let word_count = WordCount {
            id: next(&mut self.sequences.word_count),
            payload: record.word_count_payload.clone(),
            generalized_description_id: generalized_description.id,
        };

        self.articles.push(article.clone());
        self.generalized_descriptions.push(generalized_description.clone());
        self.word_counts.push(word_count.clone());

        StoredRecord {
            article,
            generalized_description,
            word_count,
        }
    }

    pub fn get_article(&self, id: i64) -> Result<ArticleDetail> {
        let article = self
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Article {} not found", id)))?;
        let generalized_description = self
            .generalized_descriptions
            .iter()
            .find(|g| g.article_id == id)
            .cloned();
        let word_counts = match &generalized_description {
            Some(g) => self
                .word_counts
                .iter()
                .find(|w| w.generalized_description_id == g.id)
                .map(|w| WordCounts::from_json(&w.payload))
                .transpose()?,
            None => None,
        };
        Ok(ArticleDetail {
            article,
            generalized_description,
            word_counts,
        })
    }

    pub fn search(&self, keyword: &str) -> Vec<ArticleUrl> {
        self.articles
            .iter()
            .filter(|a| contains_keyword(&a.description, keyword))
            .map(|a| ArticleUrl { url: a.url.clone() })
            .collect()
    }

    pub fn delete_article(&mut self, id: i64) -> Result<()> {
        let before = self.articles.len();
        self.articles.retain(|a| a.id != id);
        if self.articles.len() == before {
            return Err(Error::NotFound(format!("Article {} not found", id)));
        }
        let owned: Vec<i64> = self
            .generalized_descriptions
            .iter()
            .filter(|g| g.article_id == id)
            .map(|g| g.id)
            .collect();
        for generalized_id in owned {
            self.remove_generalized_description(generalized_id);
        }
        Ok(())
    }

    pub fn delete_generalized_description(&mut self, id: i64) -> Result<()> {
        if self.remove_generalized_description(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Generalized description {} not found", id)))
        }
    }

    fn remove_generalized_description(&mut self, id: i64) -> bool {
        let before = self.generalized_descriptions.len();
        self.generalized_descriptions.retain(|g| g.id != id);
        self.word_counts.retain(|w| w.generalized_description_id != id);
        self.generalized_descriptions.len() != before
    }

    pub fn count_rows(&self) -> RowCounts {
        RowCounts {
            articles: self.articles.len() as u64,
            generalized_descriptions: self.generalized_descriptions.len() as u64,
            word_counts: self.word_counts.len() as u64,
        }
    }

    /// Fails with `Conflict` when another account than `except` already uses
    /// the email or phone number.
    fn check_unique(&self, email: &str, phone_number: Option<&str>, except: Option<i64>) -> Result<()> {
        let others = || self.users.iter().filter(|u| Some(u.id) != except);
        if others().any(|u| u.email == email) {
            return Err(Error::Conflict(EMAIL_TAKEN.to_string()));
        }
        if let Some(phone) = phone_number {
            if others().any(|u| u.phone_number.as_deref() == Some(phone)) {
                return Err(Error::Conflict(PHONE_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    pub fn create_user(&mut self, new_user: &NewUser) -> Result<User> {
        self.check_unique(&new_user.email, new_user.phone_number.as_deref(), None)?;
        let user = User {
            id: next(&mut self.sequences.user),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            phone_number: new_user.phone_number.clone(),
            password_hash: new_user.password_hash.clone(),
        };
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub fn update_user(&mut self, id: i64, changes: &UserChanges) -> Result<User> {
        let mut user = self.get_user(id)?;
        changes.apply(&mut user);
        self.check_unique(&user.email, user.phone_number.as_deref(), Some(id))?;
        if let Some(stored) = self.users.iter_mut().find(|u| u.id == id) {
            *stored = user.clone();
        }
        Ok(user)
    }

    pub fn delete_user(&mut self, id: i64) -> Result<()> {
        let before = self.users.len();
        self.users.retain(|u| u.id != id);
        if self.users.len() == before {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn generalized_descriptions(&self) -> &[GeneralizedDescription] {
        &self.generalized_descriptions
    }

    pub fn word_counts(&self) -> &[WordCount] {
        &self.word_counts
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a consistent snapshot of all three tables.
    pub async fn inspect<R>(&self, f: impl FnOnce(&MemoryStore) -> R) -> R {
        let store = self.store.read().await;
        f(&store)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn connect(_url: &str) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn store_post(&self, record: &NewArticleRecord) -> Result<StoredRecord> {
        let mut store = self.store.write().await;
        Ok(store.store_post(record))
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        if store.articles.is_empty() {
            return Err(Error::NotFound("No articles found".to_string()));
        }
        Ok(store.articles.clone())
    }

    async fn get_article(&self, id: i64) -> Result<ArticleDetail> {
        let store = self.store.read().await;
        store.get_article(id)
    }

    async fn search_descriptions(&self, keyword: &str) -> Result<Vec<ArticleUrl>> {
        let store = self.store.read().await;
        let urls = store.search(keyword);
        if urls.is_empty() {
            return Err(Error::NotFound(format!(
                "No links found with the keyword '{}'",
                keyword
            )));
        }
        Ok(urls)
    }

    async fn delete_article(&self, id: i64) -> Result<()> {
        let mut store = self.store.write().await;
        store.delete_article(id)
    }

    async fn delete_generalized_description(&self, id: i64) -> Result<()> {
        let mut store = self.store.write().await;
        store.delete_generalized_description(id)
    }

    async fn count_rows(&self) -> Result<RowCounts> {
        let store = self.store.read().await;
        Ok(store.count_rows())
    }
}

#[async_trait]
impl UserStorage for MemoryStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut store = self.store.write().await;
        store.create_user(user)
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let store = self.store.read().await;
        let users: Vec<User> = store.users.iter().filter(|u| filter.matches(u)).cloned().collect();
        if users.is_empty() {
            return Err(Error::NotFound("Users not found".to_string()));
        }
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let store = self.store.read().await;
        store.get_user(id)
    }

    async fn find_login(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Option<User>> {
        let store = self.store.read().await;
        let by_email = email.and_then(|email| store.users.iter().find(|u| u.email == email));
        let by_phone = || {
            phone_number.and_then(|phone| {
                store
                    .users
                    .iter()
                    .find(|u| u.phone_number.as_deref() == Some(phone))
            })
        };
        Ok(by_email.or_else(by_phone).cloned())
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User> {
        let mut store = self.store.write().await;
        store.update_user(id, changes)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let mut store = self.store.write().await;
        store.delete_user(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_core::{count_words, Post};

    fn record(title: &str, description: &str) -> NewArticleRecord {
        NewArticleRecord {
            post: Post {
                title: title.to_string(),
                description: description.to_string(),
                image_source: format!("https://img.example.com/{}.jpg", title),
                url: format!("https://news.example.com/{}", title),
            },
            generalized_description: description.to_string(),
            word_count_payload: count_words(description).to_json().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let stored = storage
            .store_post(&record("k8s", "Kubernetes clusters exposed"))
            .await
            .unwrap();

        assert_eq!(stored.generalized_description.article_id, stored.article.id);
        assert_eq!(
            stored.word_count.generalized_description_id,
            stored.generalized_description.id
        );

        let urls = storage.search_descriptions("kubernetes").await.unwrap();
        assert_eq!(urls, vec![ArticleUrl { url: "https://news.example.com/k8s".to_string() }]);

        let err = storage.search_descriptions("zzz-no-match").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_empty_is_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.list_articles().await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_generalized_description_cascades() {
        let storage = MemoryStorage::new();
        let first = storage.store_post(&record("a", "one two two")).await.unwrap();
        storage.store_post(&record("b", "three")).await.unwrap();

        storage
            .delete_generalized_description(first.generalized_description.id)
            .await
            .unwrap();

        let counts = storage.count_rows().await.unwrap();
        assert_eq!(counts.articles, 2);
        assert_eq!(counts.generalized_descriptions, 1);
        assert_eq!(counts.word_counts, 1);
        let orphans = storage
            .inspect(|s| {
                s.word_counts()
                    .iter()
                    .filter(|w| w.generalized_description_id == first.generalized_description.id)
                    .count()
            })
            .await;
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_delete_article_cascades() {
        let storage = MemoryStorage::new();
        let stored = storage.store_post(&record("a", "one")).await.unwrap();
        storage.delete_article(stored.article.id).await.unwrap();

        assert_eq!(storage.count_rows().await.unwrap(), RowCounts::default());
        assert!(matches!(
            storage.delete_article(stored.article.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_get_article_detail() {
        let storage = MemoryStorage::new();
        let stored = storage.store_post(&record("a", "x y y")).await.unwrap();
        let detail = storage.get_article(stored.article.id).await.unwrap();

        assert_eq!(detail.article, stored.article);
        let counts = detail.word_counts.unwrap();
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![("y", 2), ("x", 1)]);
    }

    fn new_user(name: &str, email: &str, phone: Option<&str>) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone_number: phone.map(str::to_string),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_users_are_unique_by_email_and_phone() {
        let storage = MemoryStorage::new();
        let ada = storage
            .create_user(&new_user("Ada", "ada@example.com", Some("555-0100")))
            .await
            .unwrap();
        assert_eq!(ada.id, 1);

        let err = storage
            .create_user(&new_user("Other", "ada@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == EMAIL_TAKEN));
        let err = storage
            .create_user(&new_user("Other", "other@example.com", Some("555-0100")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == PHONE_TAKEN));

        // Two accounts without a phone number do not clash
        storage.create_user(&new_user("Bob", "bob@example.com", None)).await.unwrap();
        storage.create_user(&new_user("Cy", "cy@example.com", None)).await.unwrap();
        assert_eq!(storage.inspect(|s| s.users().len()).await, 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let storage = MemoryStorage::new();
        let ada = storage.create_user(&new_user("Ada", "ada@example.com", None)).await.unwrap();
        let bob = storage.create_user(&new_user("Bob", "bob@example.com", None)).await.unwrap();

        let err = storage
            .update_user(
                bob.id,
                &UserChanges {
                    email: Some("ada@example.com".to_string()),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Keeping your own email is not a conflict
        let updated = storage
            .update_user(
                ada.id,
                &UserChanges {
                    name: Some("Ada L.".to_string()),
                    email: Some("ada@example.com".to_string()),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(storage.get_user(ada.id).await.unwrap(), updated);

        storage.delete_user(ada.id).await.unwrap();
        assert!(matches!(storage.get_user(ada.id).await.unwrap_err(), Error::NotFound(_)));
        assert!(matches!(storage.delete_user(ada.id).await.unwrap_err(), Error::NotFound(_)));
    }
}
