//! Bearer-token authentication.
//!
//! Resolves `Authorization: Bearer <token>` to the owning user by hashed
//! lookup and attaches the result to the request. Token issuance happens
//! at user creation; there is no login flow here.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use clockface_store::{hash_token, User};

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, available to every protected handler.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let user = state
        .store
        .user_by_token_hash(hash_token(token))
        .await
        .map_err(ApiError::internal("Failed to authenticate request"))?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthContext { user });
    Ok(next.run(request).await)
}
