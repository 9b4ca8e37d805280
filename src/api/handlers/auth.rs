use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use validator::Validate;

use crate::{
    api::{handlers::users::UserDto, middleware::auth::CurrentUser, state::AppState},
    domain::{LoginRequest, RegisterRequest},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserDto,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDto>)> {
    req.validate()?;

    let user = state.service_context.users.register(req).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    req.validate()?;

    let (user, token) = state.service_context.users.login(req).await?;

    Ok(Json(LoginResponse {
        access_token: token,
        user: user.into(),
    }))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<UserDto> {
    Json(current.user.into())
}
