use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use super::{Page, TenantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, name, status, created_at, updated_at";

/// Insert a tenant and hand back its id as a [`TenantId`]. Used by
/// registration, inside the same transaction as the admin membership.
pub async fn create(db: impl PgExecutor<'_>, name: &str) -> Result<(TenantId, Tenant), sqlx::Error> {
    let tenant: Tenant = sqlx::query_as(&format!(
        "INSERT INTO tenants (name, status) VALUES ($1, 'active') RETURNING {COLUMNS}"
    ))
    .bind(name)
    .fetch_one(db)
    .await?;

    Ok((TenantId::trusted(tenant.id), tenant))
}

pub async fn find(pool: &PgPool, tenant: TenantId) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tenants WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(tenant)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    name: &str,
    status: &str,
) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE tenants SET name = $2, status = $3, updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(tenant)
    .bind(name)
    .bind(status)
    .fetch_optional(pool)
    .await
}

/// All tenants, newest first. Not tenant-scoped: platform-level listing only.
pub async fn list(pool: &PgPool, page: Page) -> Result<(Vec<Tenant>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tenants WHERE deleted_at IS NULL
         ORDER BY created_at DESC, id DESC
         LIMIT $1 OFFSET $2"
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}
