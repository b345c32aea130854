use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Local;
use clockface_store::Role;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::error::{field_errors, ApiError};
use crate::policy::{require_admin, require_user_access};
use crate::AppState;

/// GET /api/me
pub async fn me(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    Json(json!({ "success": true, "data": ctx.user }))
}

/// GET /api/users — the caller's company; all companies for superadmin.
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx.user, "Unauthorized to list users")?;
    let scope = match ctx.user.role {
        Role::Superadmin => None,
        _ => Some(ctx.user.company_id),
    };
    let users = state
        .store
        .list_users(scope)
        .await
        .map_err(ApiError::internal("Failed to retrieve users"))?;
    Ok(Json(json!({ "success": true, "data": users })))
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    name: String,
    email: String,
    role: Option<String>,
    shift_id: Option<i64>,
}

/// POST /api/users
///
/// Admin-only. The new user lands in the caller's company and receives
/// its API token in the response, exactly once.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx.user, "Unauthorized to create users")?;

    let role = match body.role.as_deref() {
        None => Role::Employee,
        Some(s) => Role::parse(s)
            .ok_or_else(|| field_errors("role", &["The role must be admin or employee."]))?,
    };
    // Only a superadmin may mint another superadmin.
    if role == Role::Superadmin && ctx.user.role != Role::Superadmin {
        return Err(ApiError::Forbidden(
            "Unauthorized to create superadmin users".to_string(),
        ));
    }

    let (user, token) = state
        .store
        .create_user(
            ctx.user.company_id,
            body.name,
            body.email,
            role,
            body.shift_id,
            Local::now().naive_local(),
        )
        .await
        .map_err(|e| {
            if e.is_constraint_violation() {
                field_errors("email", &["The email has already been taken."])
            } else {
                ApiError::internal("Failed to create user")(e)
            }
        })?;

    tracing::info!(user_id = user.id, role = role.as_str(), "user created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "data": { "user": user, "api_token": token },
        })),
    ))
}

/// GET /api/users/:id — self, same-tenant admin, or superadmin.
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(ApiError::internal("Failed to retrieve user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    require_user_access(
        &ctx.user,
        user.id,
        user.company_id,
        "Unauthorized to view this user",
    )?;
    Ok(Json(json!({ "success": true, "data": user })))
}
