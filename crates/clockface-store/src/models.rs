use chrono::{NaiveDate, NaiveDateTime};
use clockface_core::AttendanceStatus;
use serde::Serialize;

/// Access role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "superadmin" => Some(Self::Superadmin),
            "admin" => Some(Self::Admin),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Admins and superadmins can act on other users.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }
}

/// A tenant. Every descriptor and attendance record is owned by exactly
/// one company through its user.
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub shift_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Shift {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    /// "HH:MM" local wall-clock times.
    pub start_time: String,
    pub end_time: String,
}

/// Stored descriptor metadata. The vector itself is only handed out as a
/// matching candidate, never serialized back to clients wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorRecord {
    pub id: i64,
    pub user_id: i64,
    pub company_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub punch_in_time: Option<NaiveDateTime>,
    pub punch_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
}

/// One row of the dashboard's "today" list: attendance joined with the
/// user's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceListEntry {
    pub id: i64,
    pub name: String,
    pub shift: Option<String>,
    pub punch_in_time: Option<NaiveDateTime>,
    pub punch_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
}

/// Candidate-set scope for a matching request.
///
/// Default is the caller's company; matching across every tenant is a
/// deliberate, configured opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    Company(i64),
    AllTenants,
}
