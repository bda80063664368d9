use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use hn_core::{Article, ArticleDetail, ArticleUrl, IngestResult, RowCounts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::AppState;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    /// Number of listing pages to scrape.
    pub n: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: String,
    pub rows: RowCounts,
}

pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub(crate) fn path_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Health> {
    let rows = state.pipeline.storage().count_rows().await?;
    Ok(ApiResponse::ok(
        "Service is healthy",
        Health {
            status: "ok".to_string(),
            rows,
        },
    ))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> ApiResult<Vec<Article>> {
    let articles = state.pipeline.list().await?;
    Ok(ApiResponse::ok("Web Scrap found", articles))
}

pub async fn ingest_articles(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    params: Result<Query<IngestParams>, QueryRejection>,
) -> ApiResult<IngestResult> {
    let params = query(params)?;
    info!("🦗 User {} requested ingestion of {} pages", user.user_id, params.n);
    let result = state.pipeline.ingest_latest(params.n).await?;
    Ok(ApiResponse::ok(
        format!("{} web scraping entries created", result.count),
        result,
    ))
}

pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<ArticleUrl>> {
    let params = query(params)?;
    let urls = state.pipeline.search(&params.keyword).await?;
    Ok(ApiResponse::ok("Links found", urls))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<ArticleDetail> {
    let id = path_id(id)?;
    let detail = state.pipeline.article(id).await?;
    Ok(ApiResponse::ok("Article found", detail))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = path_id(id)?;
    state.pipeline.delete_article(id).await?;
    info!("🗑️ User {} deleted article {}", user.user_id, id);
    Ok(ApiResponse::ok(format!("Article {} deleted", id), ()))
}
