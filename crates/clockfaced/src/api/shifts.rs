use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::policy::require_admin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateShift {
    name: String,
    /// "HH:MM" wall-clock times.
    start_time: String,
    end_time: String,
}

/// POST /api/shifts — admin-only, lands in the caller's company.
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateShift>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx.user, "Unauthorized to create shifts")?;
    let shift = state
        .store
        .create_shift(ctx.user.company_id, body.name, body.start_time, body.end_time)
        .await
        .map_err(ApiError::internal("Failed to create shift"))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Shift created successfully",
            "data": shift,
        })),
    ))
}

/// GET /api/shifts
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let shifts = state
        .store
        .list_shifts(ctx.user.company_id)
        .await
        .map_err(ApiError::internal("Failed to retrieve shifts"))?;
    Ok(Json(json!({ "success": true, "data": shifts })))
}
