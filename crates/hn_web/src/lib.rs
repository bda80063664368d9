use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod accounts;
pub mod auth;
pub mod handlers;
pub mod passwords;
pub mod response;
pub mod state;
pub mod users;

pub use accounts::Accounts;
pub use auth::{CurrentUser, TokenAuthority};
pub use passwords::Passwords;
pub use response::{ApiError, ApiResponse};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/hackernews",
            get(handlers::list_articles).post(handlers::ingest_articles),
        )
        .route("/api/hackernews/search", get(handlers::search_articles))
        .route(
            "/api/hackernews/:id",
            get(handlers::get_article).delete(handlers::delete_article),
        )
        .route("/api/users", get(users::list_users))
        .route("/api/users/signup", post(users::sign_up))
        .route("/api/users/signin", post(users::sign_in))
        .route("/api/users/by-detail", get(users::find_users))
        .route("/api/users/me", get(users::current_user))
        .route(
            "/api/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Serves the API until the process receives Ctrl-C.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> hn_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub mod prelude {
    pub use hn_core::{Article, Error, Result};
    pub use crate::AppState;
}
