//! Role and ownership authorization.
//!
//! Pure decision functions over verified claims. The convenience predicates
//! are thin wrappers over [`require_role`] and [`require_ownership_or_role`]
//! so there is only one decision path per rule.

use super::AuthError;
use crate::models::auth::{Claims, Role};

/// Roles allowed to act on resources they do not own.
pub const STAFF_ROLES: &[Role] = &[Role::Berater, Role::Admin];

/// Allow iff the caller's role is in `allowed`.
///
/// `None` means no identity reached this check, which is an authentication
/// failure rather than a permission failure.
pub fn require_role(claims: Option<&Claims>, allowed: &[Role]) -> Result<(), AuthError> {
    let claims = claims.ok_or(AuthError::RoleNotFound)?;
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}

/// Allow iff the caller owns the resource or holds a role in `allowed`.
///
/// Ownership always wins, whatever roles are listed.
pub fn require_ownership_or_role(
    claims: Option<&Claims>,
    resource_owner_id: &str,
    allowed: &[Role],
) -> Result<(), AuthError> {
    let claims = claims.ok_or(AuthError::RoleNotFound)?;
    if claims.sub == resource_owner_id || allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AuthError::AccessDenied)
    }
}

pub fn is_admin(claims: &Claims) -> bool {
    require_role(Some(claims), &[Role::Admin]).is_ok()
}

pub fn is_berater_or_admin(claims: &Claims) -> bool {
    require_role(Some(claims), STAFF_ROLES).is_ok()
}

/// Owner, berater or admin.
pub fn can_access_resource(claims: &Claims, resource_owner_id: &str) -> bool {
    require_ownership_or_role(Some(claims), resource_owner_id, STAFF_ROLES).is_ok()
}
