use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use super::TenantId;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Stage {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub order: i32,
    pub probability: i32,
    pub color: String,
    pub is_default: bool,
    pub is_closed_won: bool,
    pub is_closed_lost: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StageFields {
    pub name: String,
    pub order: i32,
    pub probability: i32,
    pub color: String,
    pub is_default: bool,
    pub is_closed_won: bool,
    pub is_closed_lost: bool,
}

impl From<Stage> for StageFields {
    fn from(s: Stage) -> Self {
        Self {
            name: s.name,
            order: s.order,
            probability: s.probability,
            color: s.color,
            is_default: s.is_default,
            is_closed_won: s.is_closed_won,
            is_closed_lost: s.is_closed_lost,
        }
    }
}

const COLUMNS: &str = r#"id, tenant_id, name, "order", probability, color, is_default, is_closed_won, is_closed_lost, created_at, updated_at"#;

pub async fn list(db: impl PgExecutor<'_>, tenant: TenantId) -> Result<Vec<Stage>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"SELECT {COLUMNS} FROM pipeline_stages
           WHERE tenant_id = $1 AND deleted_at IS NULL
           ORDER BY "order" ASC, id ASC"#
    ))
    .bind(tenant)
    .fetch_all(db)
    .await
}

pub async fn count(db: impl PgExecutor<'_>, tenant: TenantId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM pipeline_stages WHERE tenant_id = $1 AND deleted_at IS NULL",
    )
    .bind(tenant)
    .fetch_one(db)
    .await
}

pub async fn find(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Option<Stage>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM pipeline_stages
         WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(tenant)
    .fetch_optional(pool)
    .await
}

/// Highest `order` in use, 0 for a tenant without stages.
pub async fn max_order(pool: &PgPool, tenant: TenantId) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COALESCE(MAX("order"), 0) FROM pipeline_stages
           WHERE tenant_id = $1 AND deleted_at IS NULL"#,
    )
    .bind(tenant)
    .fetch_one(pool)
    .await
}

/// Whether another live stage of the tenant already sits at `order`.
pub async fn order_taken(
    pool: &PgPool,
    tenant: TenantId,
    order: i32,
    except: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT EXISTS (
               SELECT 1 FROM pipeline_stages
               WHERE tenant_id = $1 AND "order" = $2 AND deleted_at IS NULL
                 AND ($3::bigint IS NULL OR id <> $3)
           )"#,
    )
    .bind(tenant)
    .bind(order)
    .bind(except)
    .fetch_one(pool)
    .await
}

pub async fn create(
    db: impl PgExecutor<'_>,
    tenant: TenantId,
    f: &StageFields,
) -> Result<Stage, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO pipeline_stages
            (tenant_id, name, "order", probability, color, is_default, is_closed_won, is_closed_lost)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(tenant)
    .bind(&f.name)
    .bind(f.order)
    .bind(f.probability)
    .bind(&f.color)
    .bind(f.is_default)
    .bind(f.is_closed_won)
    .bind(f.is_closed_lost)
    .fetch_one(db)
    .await
}

pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    f: &StageFields,
) -> Result<Option<Stage>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE pipeline_stages SET
            name = $3, "order" = $4, probability = $5, color = $6,
            is_closed_won = $7, is_closed_lost = $8, updated_at = now()
        WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(tenant)
    .bind(&f.name)
    .bind(f.order)
    .bind(f.probability)
    .bind(&f.color)
    .bind(f.is_closed_won)
    .bind(f.is_closed_lost)
    .fetch_optional(pool)
    .await
}

pub async fn soft_delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE pipeline_stages SET deleted_at = now()
         WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// How many of `ids` exist (and are live) in the tenant.
pub async fn count_existing(
    db: impl PgExecutor<'_>,
    tenant: TenantId,
    ids: &[i64],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM pipeline_stages
         WHERE id = ANY($1) AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(ids)
    .bind(tenant)
    .fetch_one(db)
    .await
}

pub async fn set_order(
    db: impl PgExecutor<'_>,
    tenant: TenantId,
    id: i64,
    order: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE pipeline_stages SET "order" = $3, updated_at = now()
           WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"#,
    )
    .bind(id)
    .bind(tenant)
    .bind(order)
    .execute(db)
    .await?;

    Ok(())
}
