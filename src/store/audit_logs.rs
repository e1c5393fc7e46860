use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::{Page, TenantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewAuditLog<'a> {
    pub user_id: i64,
    pub action: &'a str,
    pub resource: &'a str,
    pub resource_id: Option<i64>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// Audit rows are only ever inserted; there is no update or delete.
pub async fn insert(
    pool: &PgPool,
    tenant: TenantId,
    entry: &NewAuditLog<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO audit_logs (tenant_id, user_id, action, resource, resource_id, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(tenant)
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(entry.resource_id)
    .bind(entry.ip_address)
    .bind(entry.user_agent)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list(
    pool: &PgPool,
    tenant: TenantId,
    page: Page,
) -> Result<(Vec<AuditLog>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE tenant_id = $1")
        .bind(tenant)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(
        r"
        SELECT id, tenant_id, user_id, action, resource, resource_id, ip_address, user_agent, created_at
        FROM audit_logs
        WHERE tenant_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(tenant)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

/// Rows created in `[from, to)`.
pub async fn count_between(
    pool: &PgPool,
    tenant: TenantId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE tenant_id = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(tenant)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}
