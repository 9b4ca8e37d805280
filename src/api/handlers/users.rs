use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{Role, UpdateUserRequest, User},
    error::Result,
};

/// User as returned by the API; the password hash never leaves the
/// domain layer.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            roles: user.roles,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub users: Vec<UserDto>,
    pub total: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let users = state
        .service_context
        .users
        .list(params.limit, params.offset)
        .await?;
    let total = state.service_context.users.count().await?;

    Ok(Json(ListResponse {
        users: users.into_iter().map(UserDto::from).collect(),
        total,
    }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UserDto>> {
    let user = state.service_context.users.get(id).await?;
    Ok(Json(user.into()))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>> {
    req.validate()?;

    let user = state.service_context.users.update(id, req).await?;
    Ok(Json(user.into()))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.service_context.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
