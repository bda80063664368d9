use async_trait::async_trait;
use hn_core::{
    contains_keyword, Article, ArticleDetail, ArticleStorage, ArticleUrl, Error,
    GeneralizedDescription, NewArticleRecord, NewUser, Result, RowCounts, StoredRecord, User,
    UserChanges, UserFilter, UserStorage, WordCount, WordCounts, EMAIL_TAKEN, PHONE_TAKEN,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use crate::StorageBackend;

const MAX_CONNECTIONS: u32 = 5;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        image TEXT NOT NULL,
        titles TEXT NOT NULL,
        url TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS generalized_descriptions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS word_counts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        payload TEXT NOT NULL,
        generalized_description_id INTEGER NOT NULL
            REFERENCES generalized_descriptions(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_generalized_article ON generalized_descriptions(article_id)",
    "CREATE INDEX IF NOT EXISTS idx_word_counts_generalized ON word_counts(generalized_description_id)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone_number TEXT UNIQUE,
        password_hash TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Like `db_error`, but unique-constraint failures on `users` become `Conflict`.
fn user_write_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("users.phone_number") {
                Error::Conflict(PHONE_TAKEN.to_string())
            } else {
                Error::Conflict(EMAIL_TAKEN.to_string())
            }
        }
        _ => Error::Database(format!("{}: {}", context, e)),
    }
}

const USER_COLUMNS: &str = "SELECT id, name, email, phone_number, password_hash FROM users";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(db_error("Failed to read user"))?,
        name: row.try_get("name").map_err(db_error("Failed to read user"))?,
        email: row.try_get("email").map_err(db_error("Failed to read user"))?,
        phone_number: row.try_get("phone_number").map_err(db_error("Failed to read user"))?,
        password_hash: row.try_get("password_hash").map_err(db_error("Failed to read user"))?,
    })
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id").map_err(db_error("Failed to read article"))?,
        description: row.try_get("description").map_err(db_error("Failed to read article"))?,
        image: row.try_get("image").map_err(db_error("Failed to read article"))?,
        titles: row.try_get("titles").map_err(db_error("Failed to read article"))?,
        url: row.try_get("url").map_err(db_error("Failed to read article"))?,
    })
}

pub struct SQLiteStorage {
    pool: SqlitePool,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be reachable at the configured DATABASE_URL"
    }

    async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error("Invalid database URL"))?;
        Self::connect_with(options).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::connect_with(SqliteConnectOptions::new().filename(db_path)).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        let options = options.create_if_missing(true).foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self { pool })
    }

    async fn find_article(&self, id: i64) -> Result<Article> {
        let row = sqlx::query("SELECT id, description, image, titles, url FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?
            .ok_or_else(|| Error::NotFound(format!("Article {} not found", id)))?;
        article_from_row(&row)
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn store_post(&self, record: &NewArticleRecord) -> Result<StoredRecord> {
        let post = &record.post;
        // Dropping an uncommitted transaction rolls it back, so any early
        // return below leaves no partial rows.
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let article_id = sqlx::query(
            "INSERT INTO articles (description, image, titles, url) VALUES (?, ?, ?, ?)",
        )
        .bind(&post.description)
        .bind(&post.image_source)
        .bind(&post.title)
        .bind(&post.url)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to store article"))?
        .last_insert_rowid();

        let generalized_id = sqlx::query(
            "INSERT INTO generalized_descriptions (description, article_id) VALUES (?, ?)",
        )
        .bind(&record.generalized_description)
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to store generalized description"))?
        .last_insert_rowid();

        let word_count_id = sqlx::query(
            "INSERT INTO word_counts (payload, generalized_description_id) VALUES (?, ?)",
        )
        .bind(&record.word_count_payload)
        .bind(generalized_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to store word counts"))?
        .last_insert_rowid();

        tx.commit().await.map_err(db_error("Failed to commit article"))?;
        debug!(article_id, generalized_id, word_count_id, "stored article");

        Ok(StoredRecord {
            article: Article {
                id: article_id,
                description: post.description.clone(),
                image: post.image_source.clone(),
                titles: post.title.clone(),
                url: post.url.clone(),
            },
            generalized_description: GeneralizedDescription {
                id: generalized_id,
                description: record.generalized_description.clone(),
                article_id,
            },
            word_count: WordCount {
                id: word_count_id,
                payload: record.word_count_payload.clone(),
                generalized_description_id: generalized_id,
            },
        })
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT id, description, image, titles, url FROM articles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list articles"))?;

        if rows.is_empty() {
            return Err(Error::NotFound("No articles found".to_string()));
        }
        rows.iter().map(article_from_row).collect()
    }

    async fn get_article(&self, id: i64) -> Result<ArticleDetail> {
        let article = self.find_article(id).await?;

        let generalized_description = sqlx::query(
            "SELECT id, description, article_id FROM generalized_descriptions WHERE article_id = ? ORDER BY id LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get generalized description"))?
        .map(|row| -> Result<GeneralizedDescription> {
            Ok(GeneralizedDescription {
                id: row.try_get("id").map_err(db_error("Failed to read generalized description"))?,
                description: row
                    .try_get("description")
                    .map_err(db_error("Failed to read generalized description"))?,
                article_id: row
                    .try_get("article_id")
                    .map_err(db_error("Failed to read generalized description"))?,
            })
        })
        .transpose()?;

        let word_counts = match &generalized_description {
            Some(generalized) => {
                let payload: Option<String> = sqlx::query_scalar(
                    "SELECT payload FROM word_counts WHERE generalized_description_id = ? ORDER BY id LIMIT 1",
                )
                .bind(generalized.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to get word counts"))?;
                payload.map(|p| WordCounts::from_json(&p)).transpose()?
            }
            None => None,
        };

        Ok(ArticleDetail {
            article,
            generalized_description,
            word_counts,
        })
    }

    async fn search_descriptions(&self, keyword: &str) -> Result<Vec<ArticleUrl>> {
        // Unicode case folding; SQLite LIKE folds ASCII only
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT url, description FROM articles ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to search articles"))?;
        let urls: Vec<String> = rows
            .into_iter()
            .filter(|(_, description)| contains_keyword(description, keyword))
            .map(|(url, _)| url)
            .collect();

        if urls.is_empty() {
            return Err(Error::NotFound(format!(
                "No links found with the keyword '{}'",
                keyword
            )));
        }
        Ok(urls.into_iter().map(|url| ArticleUrl { url }).collect())
    }

    async fn delete_article(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete article"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Article {} not found", id)));
        }
        Ok(())
    }

    async fn delete_generalized_description(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM generalized_descriptions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete generalized description"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Generalized description {} not found", id)));
        }
        Ok(())
    }

    async fn count_rows(&self) -> Result<RowCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM articles) AS articles,
                (SELECT COUNT(*) FROM generalized_descriptions) AS generalized_descriptions,
                (SELECT COUNT(*) FROM word_counts) AS word_counts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count rows"))?;

        let count = |column: &str| -> Result<u64> {
            let n: i64 = row.try_get(column).map_err(db_error("Failed to read row count"))?;
            Ok(n as u64)
        };
        Ok(RowCounts {
            articles: count("articles")?,
            generalized_descriptions: count("generalized_descriptions")?,
            word_counts: count("word_counts")?,
        })
    }
}

#[async_trait]
impl UserStorage for SQLiteStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let id = sqlx::query(
            "INSERT INTO users (name, email, phone_number, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(user_write_error("Failed to create user"))?
        .last_insert_rowid();

        Ok(User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            password_hash: user.password_hash.clone(),
        })
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "{} WHERE (?1 IS NULL OR name = ?1) AND (?2 IS NULL OR phone_number = ?2) ORDER BY id",
            USER_COLUMNS
        ))
        .bind(&filter.name)
        .bind(&filter.phone_number)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list users"))?;

        if rows.is_empty() {
            return Err(Error::NotFound("Users not found".to_string()));
        }
        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let row = sqlx::query(&format!("{} WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get user"))?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        user_from_row(&row)
    }

    async fn find_login(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Option<User>> {
        for (column, value) in [("email", email), ("phone_number", phone_number)] {
            let Some(value) = value else { continue };
            let row = sqlx::query(&format!("{} WHERE {} = ? LIMIT 1", USER_COLUMNS, column))
                .bind(value)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to look up user"))?;
            if let Some(row) = row {
                return user_from_row(&row).map(Some);
            }
        }
        Ok(None)
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let row = sqlx::query(&format!("{} WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to get user"))?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        let mut user = user_from_row(&row)?;
        changes.apply(&mut user);

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, phone_number = ?, password_hash = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(user_write_error("Failed to update user"))?;

        tx.commit().await.map_err(db_error("Failed to commit user"))?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete user"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}
