//! Attendance endpoints: the face-match punch, per-user history, raw
//! listings and the dashboard aggregates.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{Datelike, Local, NaiveDate};
use clockface_core::{DescriptorError, MatchOutcome, PunchAction};
use clockface_store::MatchScope;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{fmt_date, fmt_time, round2, round4};
use crate::auth::AuthContext;
use crate::error::{field_errors, ApiError};
use crate::policy::{require_admin, require_user_access};
use crate::service::{self, MarkError};
use crate::AppState;

/// Pull the probe vector out of a loosely-typed body, reporting absent or
/// non-numeric content as per-field validation errors. Length is NOT
/// checked here; that is the descriptor constructor's job.
fn extract_probe(body: Option<Value>) -> Result<Vec<f64>, ApiError> {
    let body = body.unwrap_or(Value::Null);
    let arr = match body.get("face_descriptor") {
        Some(Value::Array(arr)) => arr,
        _ => {
            return Err(field_errors(
                "face_descriptor",
                &["The face descriptor field is required and must be an array."],
            ))
        }
    };
    arr.iter()
        .map(|v| v.as_f64())
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            field_errors(
                "face_descriptor",
                &["Each face descriptor value must be numeric."],
            )
        })
}

fn map_mark_error(err: MarkError) -> ApiError {
    match err {
        MarkError::InvalidDescriptor(DescriptorError::WrongLength(_)) => ApiError::InvalidDescriptor(
            "Incoming face descriptor must contain exactly 128 numeric values".to_string(),
        ),
        MarkError::InvalidDescriptor(DescriptorError::NonFinite(_)) => field_errors(
            "face_descriptor",
            &["Each face descriptor value must be a finite number."],
        ),
        MarkError::NoEnrollment => ApiError::NoEnrollment,
        MarkError::NoMatch { .. } => ApiError::NoMatch,
        MarkError::AlreadyComplete => ApiError::AlreadyComplete,
        MarkError::Store(e) => ApiError::internal("Failed to process attendance")(e),
    }
}

/// POST /api/attendance/mark
///
/// Match the submitted descriptor and apply today's punch transition.
/// Both transitions answer 200; the punch-in creation is not a 201.
pub async fn mark(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let probe = extract_probe(body.map(|Json(v)| v))?;

    let scope = if state.cross_tenant_match {
        MatchScope::AllTenants
    } else {
        MatchScope::Company(ctx.user.company_id)
    };

    let now = Local::now().naive_local();
    let record = service::mark_attendance(
        &state.store,
        &state.matcher,
        scope,
        probe,
        now.date(),
        now,
    )
    .await
    .map_err(map_mark_error)?;

    let confidence = round2(MatchOutcome::confidence(record.distance));
    let distance = round4(record.distance);
    let user = json!({
        "id": record.user.id,
        "name": record.user.name,
        "email": record.user.email,
    });

    let body = match record.action {
        PunchAction::PunchIn => json!({
            "success": true,
            "message": "Attendance marked successfully",
            "data": {
                "user": user,
                "action": "punch_in",
                "punch_in_time": fmt_time(record.time),
                "confidence": confidence,
                "distance": distance,
            }
        }),
        PunchAction::PunchOut => json!({
            "success": true,
            "message": "Attendance updated successfully",
            "data": {
                "user": user,
                "action": "punch_out",
                "punch_out_time": fmt_time(record.time),
                "confidence": confidence,
                "distance": distance,
            }
        }),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    month: Option<u32>,
    year: Option<i32>,
}

/// GET /api/attendance/user/:id?month=&year=
pub async fn for_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(ApiError::internal("Failed to retrieve attendance records"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    require_user_access(
        &ctx.user,
        target.id,
        target.company_id,
        "Unauthorized to view this user's attendance",
    )?;

    let today = Local::now().date_naive();
    let month = query.month.unwrap_or(today.month());
    let year = query.year.unwrap_or(today.year());
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        field_errors("month", &["The month and year must form a valid date."])
    })?;
    // Month arithmetic can leave chrono's representable range near the
    // maximum year; that is a bad request, not a panic.
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| {
            field_errors("month", &["The month and year must form a valid date."])
        })?;

    let records = state
        .store
        .attendance_for_user(target.id, first, last)
        .await
        .map_err(ApiError::internal("Failed to retrieve attendance records"))?;

    let records: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "date": fmt_date(r.date),
                "status": r.status,
                "punch_in_time": r.punch_in_time.map(fmt_time),
                "punch_out_time": r.punch_out_time.map(fmt_time),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "message": "Attendance records retrieved successfully",
        "data": {
            "user": target,
            "month": month,
            "year": year,
            "records": records,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct RawQuery {
    filter: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

/// GET /api/attendance/raw?filter=today|yesterday|custom
pub async fn raw(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<RawQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx.user, "Unauthorized to view raw attendance data")?;

    let today = Local::now().date_naive();
    let (from, to) = match query.filter.as_deref().unwrap_or("today") {
        "today" => (today, today),
        "yesterday" => {
            let y = today.pred_opt().expect("yesterday exists");
            (y, y)
        }
        "custom" => match (query.start_date, query.end_date) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(field_errors(
                    "filter",
                    &["The custom filter requires start_date and end_date."],
                ))
            }
        },
        other => {
            return Err(field_errors(
                "filter",
                &[&format!("Unknown filter: {other}")],
            ))
        }
    };

    let records = state
        .store
        .attendance_for_company(ctx.user.company_id, from, to)
        .await
        .map_err(ApiError::internal("Failed to retrieve raw attendance data"))?;

    let records: Vec<Value> = records
        .iter()
        .map(|(r, name)| {
            json!({
                "id": r.id,
                "user_id": r.user_id,
                "name": name,
                "date": fmt_date(r.date),
                "status": r.status,
                "punch_in_time": r.punch_in_time.map(fmt_time),
                "punch_out_time": r.punch_out_time.map(fmt_time),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "message": "Raw attendance data retrieved successfully",
        "data": records,
    })))
}

/// GET /api/dashboard/stats
///
/// Company-scoped headline numbers, the last seven days of present/absent
/// counts, and today's attendance list.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx.user, "Unauthorized to view dashboard statistics")?;
    let company_id = ctx.user.company_id;
    let context = "Failed to retrieve dashboard statistics";

    let today = Local::now().date_naive();
    let total_employees = state
        .store
        .count_users(company_id)
        .await
        .map_err(ApiError::internal(context))?;

    let mut weekly = Vec::with_capacity(7);
    for offset in (0..7u64).rev() {
        let day = today - chrono::Days::new(offset);
        let present = state
            .store
            .count_present_on(company_id, day)
            .await
            .map_err(ApiError::internal(context))?;
        weekly.push(json!({
            "name": day.format("%a").to_string(),
            "date": fmt_date(day),
            "present": present,
            "absent": total_employees - present,
        }));
    }

    let today_present = state
        .store
        .count_present_on(company_id, today)
        .await
        .map_err(ApiError::internal(context))?;

    let list = state
        .store
        .attendance_list_on(company_id, today)
        .await
        .map_err(ApiError::internal(context))?;
    let list: Vec<Value> = list
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "name": e.name,
                "shift": e.shift.as_deref().unwrap_or("N/A"),
                "punchIn": e.punch_in_time.map(|t| t.format("%I:%M %p").to_string()),
                "punchOut": e.punch_out_time.map(|t| t.format("%I:%M %p").to_string()),
                "status": e.status,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "message": "Dashboard statistics retrieved successfully",
        "data": {
            "stats": {
                "totalEmployees": total_employees,
                "todayPresent": today_present,
                "todayAbsent": total_employees - today_present,
            },
            "attendanceData": weekly,
            "attendanceList": list,
        }
    })))
}
