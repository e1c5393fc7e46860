use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::store::AppState;

/// Set of roles allowed through a route group.
pub trait RoleSet: 'static {
    const ALLOWED: &'static [Role];
}

/// Tenant and membership administration, audit log access.
pub struct AdminOnly;

impl RoleSet for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// Read access to the tenant's member list.
pub struct AdminOrManager;

impl RoleSet for AdminOrManager {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::Manager];
}

/// Tenant-bound caller whose role is in `R::ALLOWED`.
///
/// Taking this as a handler argument applies the full gate before the body is
/// read: 401 without a valid session, 403 without a tenant, 403 when the role
/// is not allowed.
///
/// ```ignore
/// async fn update_tenant(auth: Authorized<AdminOnly>, ...) -> Result<..., ApiError>
/// ```
pub struct Authorized<R: RoleSet> {
    pub ctx: TenantContext,
    _roles: PhantomData<fn() -> R>,
}

impl<R: RoleSet> Deref for Authorized<R> {
    type Target = TenantContext;

    fn deref(&self) -> &TenantContext {
        &self.ctx
    }
}

impl<R: RoleSet> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = TenantContext::from_request_parts(parts, state).await?;

        if let Err(e) = check_role(ctx.role, R::ALLOWED) {
            tracing::warn!(
                user_id = ctx.user_id,
                tenant_id = %ctx.tenant,
                role = %ctx.role,
                path = %parts.uri.path(),
                "permission denied"
            );
            return Err(e);
        }

        Ok(Self {
            ctx,
            _roles: PhantomData,
        })
    }
}

pub fn check_role(role: Role, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::insufficient_permissions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_gate() {
        assert!(check_role(Role::Admin, AdminOnly::ALLOWED).is_ok());
        assert!(check_role(Role::Admin, AdminOrManager::ALLOWED).is_ok());
    }

    #[test]
    fn manager_only_reads_members() {
        assert!(check_role(Role::Manager, AdminOrManager::ALLOWED).is_ok());
        assert!(check_role(Role::Manager, AdminOnly::ALLOWED).is_err());
    }

    #[test]
    fn member_blocked_from_admin_routes() {
        let err = check_role(Role::Member, AdminOnly::ALLOWED).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "insufficient permissions"));
        assert!(check_role(Role::Member, AdminOrManager::ALLOWED).is_err());
    }
}
