pub mod error;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use storage::{ArticleStorage, UserStorage, EMAIL_TAKEN, PHONE_TAKEN};
pub use types::{
    Article, ArticleDetail, ArticleUrl, GeneralizedDescription, IngestResult, NewArticleRecord,
    NewUser, Page, Post, RowCounts, StoredRecord, User, UserChanges, UserFilter, WordCount,
};
pub use text::{contains_keyword, count_words, Generalizer, StopWords, WordCounts};
