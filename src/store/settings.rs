use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::TenantId;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TenantSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

pub async fn list(pool: &PgPool, tenant: TenantId) -> Result<Vec<TenantSetting>, sqlx::Error> {
    sqlx::query_as(
        "SELECT key, value, updated_at FROM tenant_settings WHERE tenant_id = $1 ORDER BY key",
    )
    .bind(tenant)
    .fetch_all(pool)
    .await
}

pub async fn get(
    pool: &PgPool,
    tenant: TenantId,
    key: &str,
) -> Result<Option<TenantSetting>, sqlx::Error> {
    sqlx::query_as(
        "SELECT key, value, updated_at FROM tenant_settings WHERE tenant_id = $1 AND key = $2",
    )
    .bind(tenant)
    .bind(key)
    .fetch_optional(pool)
    .await
}

pub async fn upsert(
    pool: &PgPool,
    tenant: TenantId,
    key: &str,
    value: &str,
) -> Result<TenantSetting, sqlx::Error> {
    sqlx::query_as(
        r"
        INSERT INTO tenant_settings (tenant_id, key, value) VALUES ($1, $2, $3)
        ON CONFLICT (tenant_id, key)
        DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        RETURNING key, value, updated_at
        ",
    )
    .bind(tenant)
    .bind(key)
    .bind(value)
    .fetch_one(pool)
    .await
}
