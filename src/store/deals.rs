use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{TenantId, contains_pattern};
use super::contacts::Contact;
use super::stages::Stage;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Deal {
    pub id: i64,
    pub tenant_id: i64,
    pub created_by: Option<i64>,
    pub contact_id: Option<i64>,
    pub stage_id: i64,
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub currency: String,
    pub stage_order: i32,
    pub probability: i32,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub status: String,
    pub loss_reason: String,
    pub source: String,
    pub tags: Json<Vec<String>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deal with its stage and contact loaded, the shape every read returns.
#[derive(Debug, Clone, Serialize)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: Deal,
    pub stage: Option<Stage>,
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone)]
pub struct DealFields {
    pub contact_id: Option<i64>,
    pub stage_id: i64,
    pub title: String,
    pub description: String,
    pub value: Decimal,
    pub currency: String,
    pub stage_order: i32,
    pub probability: i32,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub status: String,
    pub loss_reason: String,
    pub source: String,
    pub tags: Vec<String>,
    pub notes: String,
}

impl From<Deal> for DealFields {
    fn from(d: Deal) -> Self {
        Self {
            contact_id: d.contact_id,
            stage_id: d.stage_id,
            title: d.title,
            description: d.description,
            value: d.value,
            currency: d.currency,
            stage_order: d.stage_order,
            probability: d.probability,
            expected_close_date: d.expected_close_date,
            actual_close_date: d.actual_close_date,
            status: d.status,
            loss_reason: d.loss_reason,
            source: d.source,
            tags: d.tags.0,
            notes: d.notes,
        }
    }
}

/// Columns a deal listing may be ordered by.
pub const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "title",
    "value",
    "currency",
    "contact_id",
    "stage_id",
    "stage_order",
    "probability",
    "expected_close_date",
    "actual_close_date",
    "status",
    "source",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealSort {
    column: &'static str,
    descending: bool,
}

impl DealSort {
    /// `None` when the column is not in [`SORTABLE_COLUMNS`].
    pub fn new(column: &str, descending: bool) -> Option<Self> {
        SORTABLE_COLUMNS
            .iter()
            .find(|c| **c == column)
            .map(|c| Self {
                column: *c,
                descending,
            })
    }

    fn sql(self) -> String {
        let dir = if self.descending { "DESC" } else { "ASC" };
        format!("{} {dir}, id {dir}", self.column)
    }
}

impl Default for DealSort {
    fn default() -> Self {
        Self {
            column: "created_at",
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub stage_id: Option<i64>,
    pub status: Option<String>,
    pub contact_id: Option<i64>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    /// Inclusive day bounds on `expected_close_date`.
    pub expected_close_start: Option<NaiveDate>,
    pub expected_close_end: Option<NaiveDate>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    pub sort: DealSort,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StageValue {
    pub stage_id: i64,
    pub stage_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub deal_count: i64,
}

const COLUMNS: &str = "id, tenant_id, created_by, contact_id, stage_id, title, description, \
     value, currency, stage_order, probability, expected_close_date, actual_close_date, \
     status, loss_reason, source, tags, notes, created_at, updated_at";

// $1 is always the tenant.
const FILTER: &str = r"
    WHERE tenant_id = $1 AND deleted_at IS NULL
      AND ($2::bigint IS NULL OR stage_id = $2)
      AND ($3::text IS NULL OR status = $3)
      AND ($4::bigint IS NULL OR contact_id = $4)
      AND ($5::numeric IS NULL OR value >= $5)
      AND ($6::numeric IS NULL OR value <= $6)
      AND ($7::date IS NULL OR expected_close_date >= $7::date)
      AND ($8::date IS NULL OR expected_close_date < $8::date + 1)
      AND ($9::text IS NULL OR title ILIKE $9 ESCAPE '\' OR description ILIKE $9 ESCAPE '\')
";

pub async fn create(
    pool: &PgPool,
    tenant: TenantId,
    created_by: i64,
    f: &DealFields,
) -> Result<Deal, sqlx::Error> {
    sqlx::query_as(&format!(
        r"
        INSERT INTO deals (tenant_id, created_by, contact_id, stage_id, title, description, value,
            currency, stage_order, probability, expected_close_date, actual_close_date, status,
            loss_reason, source, tags, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING {COLUMNS}
        "
    ))
    .bind(tenant)
    .bind(created_by)
    .bind(f.contact_id)
    .bind(f.stage_id)
    .bind(&f.title)
    .bind(&f.description)
    .bind(f.value)
    .bind(&f.currency)
    .bind(f.stage_order)
    .bind(f.probability)
    .bind(f.expected_close_date)
    .bind(f.actual_close_date)
    .bind(&f.status)
    .bind(&f.loss_reason)
    .bind(&f.source)
    .bind(Json(&f.tags))
    .bind(&f.notes)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Option<Deal>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM deals WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(tenant)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    f: &DealFields,
) -> Result<Option<Deal>, sqlx::Error> {
    sqlx::query_as(&format!(
        r"
        UPDATE deals SET
            contact_id = $3, stage_id = $4, title = $5, description = $6, value = $7,
            currency = $8, stage_order = $9, probability = $10, expected_close_date = $11,
            actual_close_date = $12, status = $13, loss_reason = $14, source = $15,
            tags = $16, notes = $17, updated_at = now()
        WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
        RETURNING {COLUMNS}
        "
    ))
    .bind(id)
    .bind(tenant)
    .bind(f.contact_id)
    .bind(f.stage_id)
    .bind(&f.title)
    .bind(&f.description)
    .bind(f.value)
    .bind(&f.currency)
    .bind(f.stage_order)
    .bind(f.probability)
    .bind(f.expected_close_date)
    .bind(f.actual_close_date)
    .bind(&f.status)
    .bind(&f.loss_reason)
    .bind(&f.source)
    .bind(Json(&f.tags))
    .bind(&f.notes)
    .fetch_optional(pool)
    .await
}

/// Point the deal at a new stage, taking the stage's probability, and
/// optionally set the status, all in one statement.
pub async fn move_to_stage(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    stage: &Stage,
    status: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"
        UPDATE deals SET stage_id = $3, probability = $4, status = COALESCE($5, status),
            updated_at = now()
        WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
        ",
    )
    .bind(id)
    .bind(tenant)
    .bind(stage.id)
    .bind(stage.probability)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_status(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    status: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE deals SET status = $3, updated_at = now()
         WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn soft_delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE deals SET deleted_at = now()
         WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list(
    pool: &PgPool,
    tenant: TenantId,
    filter: &DealFilter,
) -> Result<(Vec<Deal>, i64), sqlx::Error> {
    let search = filter.search.as_deref().map(contains_pattern);

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM deals {FILTER}"))
        .bind(tenant)
        .bind(filter.stage_id)
        .bind(&filter.status)
        .bind(filter.contact_id)
        .bind(filter.min_value)
        .bind(filter.max_value)
        .bind(filter.expected_close_start)
        .bind(filter.expected_close_end)
        .bind(&search)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM deals {FILTER} ORDER BY {} LIMIT $10 OFFSET $11",
        filter.sort.sql()
    ))
    .bind(tenant)
    .bind(filter.stage_id)
    .bind(&filter.status)
    .bind(filter.contact_id)
    .bind(filter.min_value)
    .bind(filter.max_value)
    .bind(filter.expected_close_start)
    .bind(filter.expected_close_end)
    .bind(&search)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

/// Live deals currently sitting in the stage.
pub async fn count_in_stage(
    pool: &PgPool,
    tenant: TenantId,
    stage_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM deals WHERE tenant_id = $1 AND stage_id = $2 AND deleted_at IS NULL",
    )
    .bind(tenant)
    .bind(stage_id)
    .fetch_one(pool)
    .await
}

/// Sum of `value` per stage over deals whose status is `active`.
pub async fn value_by_stage(pool: &PgPool, tenant: TenantId) -> Result<Vec<StageValue>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT d.stage_id, s.name AS stage_name,
               COALESCE(SUM(d.value), 0) AS total_value, COUNT(*) AS deal_count
        FROM deals d
        JOIN pipeline_stages s ON s.id = d.stage_id AND s.tenant_id = d.tenant_id
        WHERE d.tenant_id = $1 AND d.deleted_at IS NULL AND d.status = 'active'
        GROUP BY d.stage_id, s.name, s."order"
        ORDER BY s."order", d.stage_id
        "#,
    )
    .bind(tenant)
    .fetch_all(pool)
    .await
}
