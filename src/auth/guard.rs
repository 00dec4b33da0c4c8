//! Access checks that run before any repository call.

use tracing::warn;
use uuid::Uuid;

use super::extractors::AuthUser;
use crate::errors::AppError;
use crate::users::repo_types::Role;

/// The path id must name the caller. Never loads the target.
pub fn ensure_self(auth: &AuthUser, requested: Uuid) -> Result<(), AppError> {
    if auth.id != requested {
        warn!(user_id = %auth.id, requested = %requested, "identity mismatch");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_role(auth: &AuthUser, role: Role) -> Result<(), AppError> {
    if !auth.has_role(role) {
        warn!(user_id = %auth.id, role = role.as_str(), "missing role");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: &[&str]) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "alice".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn same_id_passes() {
        let auth = caller(&["User"]);
        assert!(ensure_self(&auth, auth.id).is_ok());
    }

    #[test]
    fn other_id_is_forbidden() {
        let auth = caller(&["User"]);
        let err = ensure_self(&auth, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn admin_role_is_required() {
        assert!(ensure_role(&caller(&["User", "Admin"]), Role::Admin).is_ok());
        assert!(matches!(
            ensure_role(&caller(&["User"]), Role::Admin),
            Err(AppError::Forbidden)
        ));
    }
}
