//! Authorization policy.
//!
//! One capability check used by every handler instead of per-endpoint role
//! tests: a caller may act on a user record if it is their own, if they
//! administer the same tenant, or if they are superadmin.

use clockface_store::{Role, User};

use crate::error::ApiError;

/// Can `actor` act on the user identified by (`target_id`,
/// `target_company_id`)?
pub fn may_access_user(actor: &User, target_id: i64, target_company_id: i64) -> bool {
    actor.id == target_id
        || actor.role == Role::Superadmin
        || (actor.role == Role::Admin && actor.company_id == target_company_id)
}

/// Guard version of [`may_access_user`] with the endpoint's denial message.
pub fn require_user_access(
    actor: &User,
    target_id: i64,
    target_company_id: i64,
    denied: &str,
) -> Result<(), ApiError> {
    if may_access_user(actor, target_id, target_company_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denied.to_string()))
    }
}

/// Tenant-administration guard: admin of their own company, or superadmin.
pub fn require_admin(actor: &User, denied: &str) -> Result<(), ApiError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denied.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn user(id: i64, company_id: i64, role: Role) -> User {
        User {
            id,
            company_id,
            name: "t".into(),
            email: format!("u{id}@test"),
            role,
            shift_id: None,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_self_access_always_allowed() {
        let employee = user(1, 10, Role::Employee);
        assert!(may_access_user(&employee, 1, 10));
        assert!(!may_access_user(&employee, 2, 10));
    }

    #[test]
    fn test_admin_limited_to_own_tenant() {
        let admin = user(1, 10, Role::Admin);
        assert!(may_access_user(&admin, 2, 10));
        assert!(!may_access_user(&admin, 3, 11));
    }

    #[test]
    fn test_superadmin_crosses_tenants() {
        let root = user(1, 10, Role::Superadmin);
        assert!(may_access_user(&root, 3, 11));
    }
}
