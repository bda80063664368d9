use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use hn_core::{User, UserFilter};
use serde::Serialize;
use std::sync::Arc;

use crate::accounts::{ProfileUpdate, SignIn, SignUp};
use crate::auth::CurrentUser;
use crate::handlers::{path_id, query};
use crate::response::{ApiError, ApiResponse};
use crate::AppState;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub jwt: String,
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    form: Result<Json<SignUp>, JsonRejection>,
) -> ApiResult<User> {
    let user = state.accounts.sign_up(body(form)?).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    form: Result<Json<SignIn>, JsonRejection>,
) -> ApiResult<SignedIn> {
    let jwt = state.accounts.sign_in(body(form)?, &state.tokens).await?;
    Ok(ApiResponse::ok("User signed in successfully", SignedIn { jwt }))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> ApiResult<Vec<User>> {
    let users = state.accounts.list().await?;
    Ok(ApiResponse::ok("Users found", users))
}

pub async fn find_users(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    filter: Result<Query<UserFilter>, QueryRejection>,
) -> ApiResult<Vec<User>> {
    let users = state.accounts.find(&query(filter)?).await?;
    Ok(ApiResponse::ok("Users found", users))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<User> {
    let user = state.accounts.get(user.user_id).await?;
    Ok(ApiResponse::ok("User found", user))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    form: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let id = path_id(id)?;
    let updated = state.accounts.update(user, id, body(form)?).await?;
    Ok(ApiResponse::ok("User updated successfully", updated))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = path_id(id)?;
    state.accounts.delete(user, id).await?;
    Ok(ApiResponse::ok("User deleted successfully", ()))
}
