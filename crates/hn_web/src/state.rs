use std::sync::Arc;
use hn_scrapers::IngestPipeline;

use crate::accounts::Accounts;
use crate::auth::TokenAuthority;

pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub accounts: Arc<Accounts>,
    pub tokens: Arc<TokenAuthority>,
}
