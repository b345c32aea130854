//! Face-descriptor enrollment: store (wholesale replace), inspect, delete.
//!
//! The descriptor itself is write-only through this API; reads return
//! metadata, never the vector.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Local;
use clockface_core::{Descriptor, DescriptorError};
use serde::Deserialize;
use serde_json::{json, Value};

use super::fmt_time;
use crate::auth::AuthContext;
use crate::error::{field_errors, ApiError};
use crate::policy::require_user_access;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TargetQuery {
    user_id: Option<i64>,
}

/// Resolve the user a descriptor operation applies to and enforce the
/// access policy: self, same-tenant admin, or superadmin.
async fn resolve_target(
    state: &AppState,
    ctx: &AuthContext,
    requested: Option<i64>,
    denied: &str,
) -> Result<clockface_store::User, ApiError> {
    let target_id = requested.unwrap_or(ctx.user.id);
    if target_id == ctx.user.id {
        return Ok(ctx.user.clone());
    }
    let target = state
        .store
        .user_by_id(target_id)
        .await
        .map_err(ApiError::internal("Failed to resolve user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    require_user_access(&ctx.user, target.id, target.company_id, denied)?;
    Ok(target)
}

fn parse_descriptor(body: &Value) -> Result<Descriptor, ApiError> {
    let arr = match body.get("face_descriptor") {
        Some(Value::Array(arr)) => arr,
        _ => {
            return Err(field_errors(
                "face_descriptor",
                &["The face descriptor field is required and must be an array."],
            ))
        }
    };
    let values = arr
        .iter()
        .map(|v| v.as_f64())
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            field_errors(
                "face_descriptor",
                &["Each face descriptor value must be numeric."],
            )
        })?;
    Descriptor::new(values).map_err(|e| match e {
        DescriptorError::WrongLength(_) => ApiError::InvalidDescriptor(
            "Face descriptor must contain exactly 128 numeric values".to_string(),
        ),
        DescriptorError::NonFinite(_) => field_errors(
            "face_descriptor",
            &["Each face descriptor value must be a finite number."],
        ),
    })
}

/// POST /api/face-descriptor
///
/// Enroll (201) or wholesale-replace (200) a descriptor. `user_id` in the
/// body lets admins enroll on behalf of their employees.
pub async fn store(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let descriptor = parse_descriptor(&body)?;
    let requested = body.get("user_id").and_then(Value::as_i64);
    let target = resolve_target(
        &state,
        &ctx,
        requested,
        "Unauthorized to register face for another user",
    )
    .await?;

    let now = Local::now().naive_local();
    let (record, created) = state
        .store
        .upsert_descriptor(target.id, target.company_id, &descriptor, now)
        .await
        .map_err(ApiError::internal("Failed to save face descriptor"))?;

    tracing::info!(user_id = target.id, created, "descriptor enrolled");

    if created {
        Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Face descriptor saved successfully",
                "data": {
                    "id": record.id,
                    "user_id": record.user_id,
                    "created_at": fmt_time(record.created_at),
                }
            })),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Face descriptor updated successfully",
                "data": {
                    "id": record.id,
                    "user_id": record.user_id,
                    "updated_at": fmt_time(record.updated_at),
                }
            })),
        ))
    }
}

/// GET /api/face-descriptor[?user_id=]
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<TargetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_target(
        &state,
        &ctx,
        query.user_id,
        "Unauthorized to access face descriptor for another user",
    )
    .await?;

    let record = state
        .store
        .descriptor_record(target.id)
        .await
        .map_err(ApiError::internal("Failed to get face descriptor"))?
        .ok_or_else(|| ApiError::NotFound("Face descriptor not found for user".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": record.id,
            "user_id": record.user_id,
            "created_at": fmt_time(record.created_at),
            "updated_at": fmt_time(record.updated_at),
        }
    })))
}

/// DELETE /api/face-descriptor[?user_id=]
pub async fn destroy(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<TargetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_target(
        &state,
        &ctx,
        query.user_id,
        "Unauthorized to delete face descriptor for another user",
    )
    .await?;

    let deleted = state
        .store
        .delete_descriptor(target.id)
        .await
        .map_err(ApiError::internal("Failed to delete face descriptor"))?;
    if !deleted {
        return Err(ApiError::NotFound(
            "Face descriptor not found for user".to_string(),
        ));
    }

    tracing::info!(user_id = target.id, "descriptor deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Face descriptor deleted successfully",
    })))
}
