use async_trait::async_trait;
use hn_core::{ArticleStorage, Error, Result, UserStorage};
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn connect(url: &str) -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageKind {
    Memory,
    #[default]
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Handles onto one opened backend.
#[derive(Clone)]
pub struct Storage {
    pub articles: Arc<dyn ArticleStorage>,
    pub users: Arc<dyn UserStorage>,
}

impl Storage {
    pub fn new<T: ArticleStorage + UserStorage + 'static>(backend: T) -> Self {
        let backend = Arc::new(backend);
        Self {
            articles: backend.clone(),
            users: backend,
        }
    }
}

/// Opens the configured backend. `url` is ignored by the memory backend.
pub async fn create_storage(kind: StorageKind, url: &str) -> Result<Storage> {
    let storage = match kind {
        StorageKind::Memory => Storage::new(connect_backend::<MemoryStorage>(url).await?),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Storage::new(connect_backend::<SQLiteStorage>(url).await?),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(Error::Database(
                "SQLite support was not compiled in (enable the `sqlite` feature)".to_string(),
            ))
        }
    };
    info!("💾 Storage backend ready (using {})", kind);
    Ok(storage)
}

async fn connect_backend<T: StorageBackend>(url: &str) -> Result<T> {
    T::connect(url).await.map_err(|e| match e {
        Error::Database(msg) => Error::Database(format!("{} ({})", msg, T::get_error_message())),
        other => other,
    })
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Storage, StorageBackend, StorageKind};
}
