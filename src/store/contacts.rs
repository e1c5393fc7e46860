use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{Page, TenantId, contains_pattern};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub tenant_id: i64,
    pub created_by: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub mobile: String,
    pub company_name: String,
    pub position: String,
    pub department: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub status: String,
    pub source: String,
    pub tags: Json<Vec<String>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable contact fields, used for both insert and full-row update.
#[derive(Debug, Clone, Default)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub mobile: String,
    pub company_name: String,
    pub position: String,
    pub department: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub status: String,
    pub source: String,
    pub tags: Vec<String>,
    pub notes: String,
}

impl From<Contact> for ContactFields {
    fn from(c: Contact) -> Self {
        Self {
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone: c.phone,
            mobile: c.mobile,
            company_name: c.company_name,
            position: c.position,
            department: c.department,
            address: c.address,
            city: c.city,
            province: c.province,
            postal_code: c.postal_code,
            country: c.country,
            status: c.status,
            source: c.source,
            tags: c.tags.0,
            notes: c.notes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Case-insensitive substring over name, email, phone and company.
    pub search: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    /// Every listed tag must be present on the contact.
    pub tags: Vec<String>,
}

const COLUMNS: &str = "id, tenant_id, created_by, first_name, last_name, email, phone, mobile, \
     company_name, position, department, address, city, province, postal_code, country, \
     status, source, tags, notes, created_at, updated_at";

// $1 is always the tenant.
const FILTER: &str = r"
    WHERE tenant_id = $1 AND deleted_at IS NULL
      AND ($2::text IS NULL
           OR LOWER(first_name) LIKE $2 ESCAPE '\' OR LOWER(last_name) LIKE $2 ESCAPE '\'
           OR LOWER(email) LIKE $2 ESCAPE '\' OR LOWER(phone) LIKE $2 ESCAPE '\'
           OR LOWER(company_name) LIKE $2 ESCAPE '\')
      AND ($3::text IS NULL OR status = $3)
      AND ($4::text IS NULL OR source = $4)
      AND ($5::text IS NULL OR city = $5)
      AND ($6::text IS NULL OR province = $6)
      AND ($7::jsonb IS NULL OR tags @> $7)
";

pub async fn create(
    pool: &PgPool,
    tenant: TenantId,
    created_by: i64,
    f: &ContactFields,
) -> Result<Contact, sqlx::Error> {
    sqlx::query_as(&format!(
        r"
        INSERT INTO contacts (tenant_id, created_by, first_name, last_name, email, phone, mobile,
            company_name, position, department, address, city, province, postal_code, country,
            status, source, tags, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING {COLUMNS}
        "
    ))
    .bind(tenant)
    .bind(created_by)
    .bind(&f.first_name)
    .bind(&f.last_name)
    .bind(&f.email)
    .bind(&f.phone)
    .bind(&f.mobile)
    .bind(&f.company_name)
    .bind(&f.position)
    .bind(&f.department)
    .bind(&f.address)
    .bind(&f.city)
    .bind(&f.province)
    .bind(&f.postal_code)
    .bind(&f.country)
    .bind(&f.status)
    .bind(&f.source)
    .bind(Json(&f.tags))
    .bind(&f.notes)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Option<Contact>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM contacts WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(tenant)
    .fetch_optional(pool)
    .await
}

pub async fn find_many(
    pool: &PgPool,
    tenant: TenantId,
    ids: &[i64],
) -> Result<Vec<Contact>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM contacts WHERE id = ANY($1) AND tenant_id = $2 AND deleted_at IS NULL"
    ))
    .bind(ids)
    .bind(tenant)
    .fetch_all(pool)
    .await
}

pub async fn exists(pool: &PgPool, tenant: TenantId, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM contacts WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL)",
    )
    .bind(id)
    .bind(tenant)
    .fetch_one(pool)
    .await
}

/// Overwrite every writable column. `tenant_id` and `created_by` never change.
pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    f: &ContactFields,
) -> Result<Option<Contact>, sqlx::Error> {
    sqlx::query_as(&format!(
        r"
        UPDATE contacts SET
            first_name = $3, last_name = $4, email = $5, phone = $6, mobile = $7,
            company_name = $8, position = $9, department = $10, address = $11, city = $12,
            province = $13, postal_code = $14, country = $15, status = $16, source = $17,
            tags = $18, notes = $19, updated_at = now()
        WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
        RETURNING {COLUMNS}
        "
    ))
    .bind(id)
    .bind(tenant)
    .bind(&f.first_name)
    .bind(&f.last_name)
    .bind(&f.email)
    .bind(&f.phone)
    .bind(&f.mobile)
    .bind(&f.company_name)
    .bind(&f.position)
    .bind(&f.department)
    .bind(&f.address)
    .bind(&f.city)
    .bind(&f.province)
    .bind(&f.postal_code)
    .bind(&f.country)
    .bind(&f.status)
    .bind(&f.source)
    .bind(Json(&f.tags))
    .bind(&f.notes)
    .fetch_optional(pool)
    .await
}

/// Returns `false` when nothing matched in this tenant.
pub async fn soft_delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE contacts SET deleted_at = now()
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
    filter: &ContactFilter,
    page: Page,
) -> Result<(Vec<Contact>, i64), sqlx::Error> {
    let search = filter
        .search
        .as_deref()
        .map(|s| contains_pattern(&s.to_lowercase()));
    let tags = (!filter.tags.is_empty()).then(|| Json(filter.tags.clone()));

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contacts {FILTER}"))
        .bind(tenant)
        .bind(&search)
        .bind(&filter.status)
        .bind(&filter.source)
        .bind(&filter.city)
        .bind(&filter.province)
        .bind(&tags)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM contacts {FILTER}
         ORDER BY first_name ASC, last_name ASC, id ASC
         LIMIT $8 OFFSET $9"
    ))
    .bind(tenant)
    .bind(&search)
    .bind(&filter.status)
    .bind(&filter.source)
    .bind(&filter.city)
    .bind(&filter.province)
    .bind(&tags)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

/// Live contacts created in `[from, to)`.
pub async fn count_created_between(
    pool: &PgPool,
    tenant: TenantId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM contacts
         WHERE tenant_id = $1 AND deleted_at IS NULL AND created_at >= $2 AND created_at < $3",
    )
    .bind(tenant)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}
