use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    api::state::AppState,
    auth::bearer_token,
    domain::{Role, User},
    error::AppError,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.user
            .roles
            .iter()
            .any(|role| matches!(role, Role::Admin | Role::Superadmin))
    }
}

async fn authenticate(state: &AppState, request: &mut Request) -> Result<CurrentUser, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = bearer_token(header).ok_or(AppError::Unauthorized)?;

    let claims = state.service_context.auth_service.verify_token(token)?;

    // The token may outlive the account, so the user must still exist.
    let user = state
        .service_context
        .user_repo
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(CurrentUser { user })
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = authenticate(&state, &mut request).await?;

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = authenticate(&state, &mut request).await?;

    if !current.is_admin() {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}
