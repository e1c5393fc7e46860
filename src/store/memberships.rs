use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use super::tenants::Tenant;
use super::users::User;
use super::{Page, TenantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Membership {
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A membership with its tenant, as shown to the member.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipWithTenant {
    #[serde(flatten)]
    pub membership: Membership,
    pub tenant: Tenant,
}

/// A membership with its user, as shown to tenant administrators.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipWithUser {
    #[serde(flatten)]
    pub membership: Membership,
    pub user: User,
}

#[derive(sqlx::FromRow)]
struct TenantJoinRow {
    id: i64,
    tenant_id: i64,
    user_id: i64,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    tenant_name: String,
    tenant_status: String,
    tenant_created_at: DateTime<Utc>,
    tenant_updated_at: DateTime<Utc>,
}

impl From<TenantJoinRow> for MembershipWithTenant {
    fn from(r: TenantJoinRow) -> Self {
        Self {
            tenant: Tenant {
                id: r.tenant_id,
                name: r.tenant_name,
                status: r.tenant_status,
                created_at: r.tenant_created_at,
                updated_at: r.tenant_updated_at,
            },
            membership: Membership {
                id: r.id,
                tenant_id: r.tenant_id,
                user_id: r.user_id,
                role: r.role,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserJoinRow {
    id: i64,
    tenant_id: i64,
    user_id: i64,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_email: String,
    user_password_hash: String,
    user_full_name: String,
    user_is_active: bool,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl From<UserJoinRow> for MembershipWithUser {
    fn from(r: UserJoinRow) -> Self {
        Self {
            user: User {
                id: r.user_id,
                email: r.user_email,
                password_hash: r.user_password_hash,
                full_name: r.user_full_name,
                is_active: r.user_is_active,
                created_at: r.user_created_at,
                updated_at: r.user_updated_at,
            },
            membership: Membership {
                id: r.id,
                tenant_id: r.tenant_id,
                user_id: r.user_id,
                role: r.role,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
        }
    }
}

const COLUMNS: &str = "id, tenant_id, user_id, role, created_at, updated_at";

pub async fn create(
    db: impl PgExecutor<'_>,
    tenant: TenantId,
    user_id: i64,
    role: &str,
) -> Result<Membership, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO tenant_users (tenant_id, user_id, role) VALUES ($1, $2, $3)
         RETURNING {COLUMNS}"
    ))
    .bind(tenant)
    .bind(user_id)
    .bind(role)
    .fetch_one(db)
    .await
}

pub async fn find(
    db: impl PgExecutor<'_>,
    tenant: TenantId,
    user_id: i64,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tenant_users WHERE tenant_id = $1 AND user_id = $2"
    ))
    .bind(tenant)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Memberships of a user across tenants, in creation order. The first entry
/// is the tenant a login binds to when none is requested.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<MembershipWithTenant>, sqlx::Error> {
    let rows: Vec<TenantJoinRow> = sqlx::query_as(
        r"
        SELECT tu.id, tu.tenant_id, tu.user_id, tu.role, tu.created_at, tu.updated_at,
               t.name AS tenant_name, t.status AS tenant_status,
               t.created_at AS tenant_created_at, t.updated_at AS tenant_updated_at
        FROM tenant_users tu
        JOIN tenants t ON t.id = tu.tenant_id
        WHERE tu.user_id = $1 AND t.deleted_at IS NULL
        ORDER BY tu.created_at, tu.id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn list_for_tenant(
    pool: &PgPool,
    tenant: TenantId,
    page: Page,
) -> Result<(Vec<MembershipWithUser>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenant_users WHERE tenant_id = $1")
        .bind(tenant)
        .fetch_one(pool)
        .await?;

    let rows: Vec<UserJoinRow> = sqlx::query_as(
        r"
        SELECT tu.id, tu.tenant_id, tu.user_id, tu.role, tu.created_at, tu.updated_at,
               u.email AS user_email, u.password_hash AS user_password_hash,
               u.full_name AS user_full_name, u.is_active AS user_is_active,
               u.created_at AS user_created_at, u.updated_at AS user_updated_at
        FROM tenant_users tu
        JOIN users u ON u.id = tu.user_id
        WHERE tu.tenant_id = $1
        ORDER BY tu.created_at, tu.id
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(tenant)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((rows.into_iter().map(Into::into).collect(), total))
}

/// Returns `false` when the user has no membership in the tenant.
pub async fn update_role(
    pool: &PgPool,
    tenant: TenantId,
    user_id: i64,
    role: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tenant_users SET role = $3, updated_at = now()
         WHERE tenant_id = $1 AND user_id = $2",
    )
    .bind(tenant)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the user has no membership in the tenant.
pub async fn delete(pool: &PgPool, tenant: TenantId, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tenant_users WHERE tenant_id = $1 AND user_id = $2")
        .bind(tenant)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
