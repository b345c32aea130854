use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Local;
use clockface_store::Role;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::error::{field_errors, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterCompany {
    company_name: String,
    company_email: String,
    admin_name: String,
    admin_email: String,
}

/// POST /api/companies/register (public)
///
/// Create a tenant together with its first admin user. The admin's API
/// token is returned once; everything else in the tenant is provisioned
/// through authenticated endpoints.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterCompany>,
) -> Result<impl IntoResponse, ApiError> {
    let duplicate_or_internal = |field: &'static str| {
        move |e: clockface_store::StoreError| {
            if e.is_constraint_violation() {
                field_errors(field, &["The email has already been taken."])
            } else {
                ApiError::internal("Failed to register company")(e)
            }
        }
    };

    let now = Local::now().naive_local();
    let company = state
        .store
        .create_company(body.company_name, body.company_email, now)
        .await
        .map_err(duplicate_or_internal("company_email"))?;
    let (admin, token) = state
        .store
        .create_user(
            company.id,
            body.admin_name,
            body.admin_email,
            Role::Admin,
            None,
            now,
        )
        .await
        .map_err(duplicate_or_internal("admin_email"))?;

    tracing::info!(company_id = company.id, admin_id = admin.id, "company registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Company registered successfully",
            "data": { "company": company, "admin": admin, "api_token": token },
        })),
    ))
}

/// GET /api/company/details — the caller's own tenant.
pub async fn details(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state
        .store
        .company_by_id(ctx.user.company_id)
        .await
        .map_err(ApiError::internal("Failed to retrieve company details"))?
        .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?;
    Ok(Json(json!({ "success": true, "data": company })))
}
