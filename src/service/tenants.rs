use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::password;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::store::audit_logs::{self, AuditLog};
use crate::store::memberships::{self, MembershipWithUser};
use crate::store::settings::{self, TenantSetting};
use crate::store::tenants::{self, Tenant};
use crate::store::users::{self, User};
use crate::store::{Page, TenantId};
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddUserInput {
    pub email: String,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
}

#[derive(Debug)]
pub struct AddedUser {
    pub user: User,
    pub is_new_user: bool,
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("invalid role. must be: admin, manager, or member"))
}

pub async fn get_tenant(pool: &PgPool, tenant: TenantId) -> Result<Tenant, ApiError> {
    tenants::find(pool, tenant)
        .await?
        .ok_or_else(|| ApiError::not_found("tenant not found"))
}

#[tracing::instrument(skip(pool, patch), fields(tenant_id = %tenant), err)]
pub async fn update_tenant(
    pool: &PgPool,
    tenant: TenantId,
    patch: &TenantPatch,
) -> Result<Tenant, ApiError> {
    let current = get_tenant(pool, tenant).await?;

    let name = match &patch.name {
        Some(name) => {
            validation::check_required(name, "tenant name is required", "tenant name", 255)?;
            name.trim().to_owned()
        }
        None => current.name,
    };
    let status = match &patch.status {
        Some(status) => {
            validation::check_tenant_status(status)?;
            status.clone()
        }
        None => current.status,
    };

    tenants::update(pool, tenant, &name, &status)
        .await?
        .ok_or_else(|| ApiError::not_found("tenant not found"))
}

/// Grant `input.role` in the tenant to the user with `input.email`, creating
/// the account first when the email is unknown.
#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant, email = %input.email), err)]
pub async fn add_user(
    pool: &PgPool,
    tenant: TenantId,
    input: &AddUserInput,
) -> Result<AddedUser, ApiError> {
    let role = parse_role(&input.role)?;
    let email = input.email.trim().to_lowercase();
    validation::check_email(&email)?;

    let mut tx = pool.begin().await?;

    let (user, is_new_user) = match users::find_by_email(&mut *tx, &email).await? {
        Some(existing) => {
            if memberships::find(&mut *tx, tenant, existing.id).await?.is_some() {
                return Err(ApiError::bad_request("user already exists in this tenant"));
            }
            (existing, false)
        }
        None => {
            let plain = input
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::bad_request("password is required for new user"))?;
            validation::check_password(plain)?;
            let full_name = input.full_name.as_deref().unwrap_or_default().trim();
            validation::check_length("full name", full_name, 0, 255)?;

            let hash = password::hash_password(plain).map_err(ApiError::Internal)?;
            (users::create(&mut *tx, &email, &hash, full_name).await?, true)
        }
    };

    memberships::create(&mut *tx, tenant, user.id, role.as_str()).await?;
    tx.commit().await?;

    Ok(AddedUser { user, is_new_user })
}

pub async fn update_role(
    pool: &PgPool,
    tenant: TenantId,
    user_id: i64,
    role: &str,
) -> Result<Role, ApiError> {
    let role = parse_role(role)?;
    if !memberships::update_role(pool, tenant, user_id, role.as_str()).await? {
        return Err(ApiError::not_found("user not found in tenant"));
    }
    Ok(role)
}

pub async fn remove_user(pool: &PgPool, tenant: TenantId, user_id: i64) -> Result<(), ApiError> {
    if !memberships::delete(pool, tenant, user_id).await? {
        return Err(ApiError::not_found("user not found in tenant"));
    }
    Ok(())
}

pub async fn list_users(
    pool: &PgPool,
    tenant: TenantId,
    page: Page,
) -> Result<(Vec<MembershipWithUser>, i64), ApiError> {
    Ok(memberships::list_for_tenant(pool, tenant, page).await?)
}

/// Every live tenant on the platform. Not tenant-scoped and not routed.
pub async fn list_all_tenants(pool: &PgPool, page: Page) -> Result<(Vec<Tenant>, i64), ApiError> {
    Ok(tenants::list(pool, page).await?)
}

pub async fn list_audit_logs(
    pool: &PgPool,
    tenant: TenantId,
    page: Page,
) -> Result<(Vec<AuditLog>, i64), ApiError> {
    Ok(audit_logs::list(pool, tenant, page).await?)
}

// -- settings --

pub async fn list_settings(pool: &PgPool, tenant: TenantId) -> Result<Vec<TenantSetting>, ApiError> {
    Ok(settings::list(pool, tenant).await?)
}

pub async fn get_setting(
    pool: &PgPool,
    tenant: TenantId,
    key: &str,
) -> Result<TenantSetting, ApiError> {
    settings::get(pool, tenant, key)
        .await?
        .ok_or_else(|| ApiError::not_found("setting not found"))
}

pub async fn set_setting(
    pool: &PgPool,
    tenant: TenantId,
    key: &str,
    value: &str,
) -> Result<TenantSetting, ApiError> {
    validation::check_length("key", key, 1, 100)?;
    validation::check_length("value", value, 0, 10_000)?;
    Ok(settings::upsert(pool, tenant, key, value).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("admin", Role::Admin)]
    #[case("manager", Role::Manager)]
    #[case("member", Role::Member)]
    fn known_roles_parse(#[case] raw: &str, #[case] want: Role) {
        assert_eq!(parse_role(raw).unwrap(), want);
    }

    #[rstest]
    #[case("owner")]
    #[case("")]
    #[case("Admin ")]
    fn unknown_roles_rejected_with_message(#[case] raw: &str) {
        let err = parse_role(raw).unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref m) if m == "invalid role. must be: admin, manager, or member")
        );
    }
}
