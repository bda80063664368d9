use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network failure or non-success status while fetching a listing page.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The page did not have the expected post structure.
    #[error("Malformed page {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A unique value, such as an account email, is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPage {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
