use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{password, token};
use crate::config::Config;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::store::memberships::{self, MembershipWithTenant};
use crate::store::tenants::{self, Tenant};
use crate::store::users::{self, User};
use crate::store::TenantId;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub tenant_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub tenant_id: Option<i64>,
}

#[derive(Debug)]
pub struct Registered {
    pub user: User,
    pub tenant: Tenant,
    pub token: String,
}

#[derive(Debug)]
pub struct LoggedIn {
    pub user: User,
    pub token: String,
    pub tenant_id: i64,
    pub role: Role,
    pub available_tenants: Vec<MembershipWithTenant>,
}

#[derive(Debug)]
pub struct Switched {
    pub token: String,
    pub tenant_id: i64,
    pub role: Role,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign a session token bound to `tenant` with `role`.
pub fn issue_token(
    config: &Config,
    user_id: i64,
    email: &str,
    tenant: TenantId,
    role: Role,
) -> Result<String, ApiError> {
    let claims = token::Claims::new(user_id, Some(tenant), email, Some(role), config.jwt_expiry);
    token::sign(&claims, &config.jwt_secret).map_err(ApiError::Internal)
}

/// Create the user, its tenant and the admin membership in one transaction.
#[tracing::instrument(skip(pool, config, input), fields(email = %input.email), err)]
pub async fn register(
    pool: &PgPool,
    config: &Config,
    input: &RegisterInput,
) -> Result<Registered, ApiError> {
    let email = normalize_email(&input.email);
    validation::check_email(&email)?;
    validation::check_password(&input.password)?;
    validation::check_required(&input.full_name, "full name is required", "full name", 255)?;
    validation::check_required(&input.tenant_name, "tenant name is required", "tenant name", 255)?;

    if users::find_by_email(pool, &email).await?.is_some() {
        return Err(ApiError::bad_request("user with this email already exists"));
    }

    let hash = password::hash_password(&input.password).map_err(ApiError::Internal)?;

    let mut tx = pool.begin().await?;
    let user = users::create(&mut *tx, &email, &hash, input.full_name.trim()).await?;
    let (tenant_id, tenant) = tenants::create(&mut *tx, input.tenant_name.trim()).await?;
    memberships::create(&mut *tx, tenant_id, user.id, Role::Admin.as_str()).await?;
    tx.commit().await?;

    let token = issue_token(config, user.id, &user.email, tenant_id, Role::Admin)?;

    tracing::info!(user_id = user.id, tenant_id = %tenant_id, "tenant registered");
    Ok(Registered {
        user,
        tenant,
        token,
    })
}

#[tracing::instrument(skip(pool, config, input), fields(email = %input.email), err)]
pub async fn login(
    pool: &PgPool,
    config: &Config,
    input: &LoginInput,
) -> Result<LoggedIn, ApiError> {
    let email = normalize_email(&input.email);
    let user = users::find_by_email(pool, &email).await?;

    // Timing-safe: always run argon2 verify even when user not found
    let hash_to_verify = user
        .as_ref()
        .map_or(password::dummy_hash(), |u| u.password_hash.as_str());
    let password_valid =
        password::verify_password(&input.password, hash_to_verify).map_err(ApiError::Internal)?;

    let user = match user {
        Some(u) if password_valid && u.is_active => u,
        _ => return Err(ApiError::invalid_credentials()),
    };

    let available_tenants = memberships::list_for_user(pool, user.id).await?;
    let chosen = match input.tenant_id {
        Some(requested) => available_tenants
            .iter()
            .find(|m| m.membership.tenant_id == requested)
            .ok_or_else(|| ApiError::Forbidden("access denied to specified tenant".into()))?,
        None => available_tenants
            .first()
            .ok_or_else(|| ApiError::bad_request("user not associated with any tenant"))?,
    };

    let tenant_id = chosen.membership.tenant_id;
    let role = parse_role(&chosen.membership.role)?;
    let token = issue_token(config, user.id, &user.email, TenantId::trusted(tenant_id), role)?;

    Ok(LoggedIn {
        user,
        token,
        tenant_id,
        role,
        available_tenants,
    })
}

pub async fn my_tenants(pool: &PgPool, user_id: i64) -> Result<Vec<MembershipWithTenant>, ApiError> {
    Ok(memberships::list_for_user(pool, user_id).await?)
}

/// Reissue the caller's token bound to another tenant they belong to.
#[tracing::instrument(skip(pool, config, email), err)]
pub async fn switch_tenant(
    pool: &PgPool,
    config: &Config,
    user_id: i64,
    email: &str,
    tenant_id: i64,
) -> Result<Switched, ApiError> {
    let memberships = memberships::list_for_user(pool, user_id).await?;
    let membership = memberships
        .iter()
        .find(|m| m.membership.tenant_id == tenant_id)
        .ok_or_else(|| ApiError::Forbidden("access denied to this tenant".into()))?;

    let role = parse_role(&membership.membership.role)?;
    let token = issue_token(config, user_id, email, TenantId::trusted(tenant_id), role)?;

    Ok(Switched {
        token,
        tenant_id,
        role,
    })
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse().map_err(ApiError::Internal)
}
