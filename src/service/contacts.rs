use serde::Deserialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::store::contacts::{self, Contact, ContactFields, ContactFilter};
use crate::store::{Page, TenantId};
use crate::validation;

/// Contact body for both create and partial update. Absent fields are left
/// as they are (or at their defaults on create).
#[derive(Debug, Default, Deserialize)]
pub struct ContactInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

const DEFAULT_COUNTRY: &str = "Indonesia";

fn set(target: &mut String, value: Option<&String>) {
    if let Some(v) = value {
        v.trim().clone_into(target);
    }
}

/// Overlay `input` on `fields` and check the result.
fn apply(fields: &mut ContactFields, input: &ContactInput) -> Result<(), ApiError> {
    if let Some(first_name) = &input.first_name {
        validation::check_required(first_name, "first name is required", "first name", 100)?;
    }
    if let Some(email) = input.email.as_deref().map(str::trim)
        && !email.is_empty()
    {
        validation::check_email(email)?;
    }
    if let Some(status) = &input.status {
        validation::check_contact_status(status)?;
    }
    if let Some(tags) = &input.tags {
        validation::check_tags(tags)?;
    }

    set(&mut fields.first_name, input.first_name.as_ref());
    set(&mut fields.last_name, input.last_name.as_ref());
    set(&mut fields.email, input.email.as_ref());
    set(&mut fields.phone, input.phone.as_ref());
    set(&mut fields.mobile, input.mobile.as_ref());
    set(&mut fields.company_name, input.company_name.as_ref());
    set(&mut fields.position, input.position.as_ref());
    set(&mut fields.department, input.department.as_ref());
    set(&mut fields.address, input.address.as_ref());
    set(&mut fields.city, input.city.as_ref());
    set(&mut fields.province, input.province.as_ref());
    set(&mut fields.postal_code, input.postal_code.as_ref());
    set(&mut fields.country, input.country.as_ref());
    set(&mut fields.status, input.status.as_ref());
    set(&mut fields.source, input.source.as_ref());
    set(&mut fields.notes, input.notes.as_ref());
    if let Some(tags) = &input.tags {
        fields.tags.clone_from(tags);
    }

    if fields.first_name.is_empty() {
        return Err(ApiError::bad_request("first name is required"));
    }
    if fields.country.is_empty() {
        fields.country = DEFAULT_COUNTRY.into();
    }
    Ok(())
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn create(
    pool: &PgPool,
    tenant: TenantId,
    created_by: i64,
    input: &ContactInput,
) -> Result<Contact, ApiError> {
    let mut fields = ContactFields {
        status: "active".into(),
        country: DEFAULT_COUNTRY.into(),
        ..ContactFields::default()
    };
    apply(&mut fields, input)?;

    Ok(contacts::create(pool, tenant, created_by, &fields).await?)
}

pub async fn get(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Contact, ApiError> {
    contacts::find(pool, tenant, id)
        .await?
        .ok_or_else(|| ApiError::not_found("contact not found"))
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    input: &ContactInput,
) -> Result<Contact, ApiError> {
    let mut fields = ContactFields::from(get(pool, tenant, id).await?);
    apply(&mut fields, input)?;

    contacts::update(pool, tenant, id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("contact not found"))
}

pub async fn delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<(), ApiError> {
    if !contacts::soft_delete(pool, tenant, id).await? {
        return Err(ApiError::not_found("contact not found"));
    }
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    tenant: TenantId,
    filter: &ContactFilter,
    page: Page,
) -> Result<(Vec<Contact>, i64), ApiError> {
    Ok(contacts::list(pool, tenant, filter, page).await?)
}

pub async fn search(
    pool: &PgPool,
    tenant: TenantId,
    query: &str,
    page: Page,
) -> Result<(Vec<Contact>, i64), ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("search query is required"));
    }
    let filter = ContactFilter {
        search: Some(query.to_owned()),
        ..ContactFilter::default()
    };
    list(pool, tenant, &filter, page).await
}

/// Split a comma separated tag list, dropping blanks.
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> ContactFields {
        ContactFields {
            status: "active".into(),
            country: DEFAULT_COUNTRY.into(),
            ..ContactFields::default()
        }
    }

    #[test]
    fn create_requires_first_name() {
        let err = apply(&mut created(), &ContactInput::default()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "first name is required"));
    }

    #[test]
    fn blank_first_name_rejected() {
        let input = ContactInput {
            first_name: Some("  ".into()),
            ..ContactInput::default()
        };
        assert!(apply(&mut created(), &input).is_err());
    }

    #[test]
    fn defaults_applied_on_create() {
        let mut fields = created();
        let input = ContactInput {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..ContactInput::default()
        };
        apply(&mut fields, &input).unwrap();
        assert_eq!(fields.status, "active");
        assert_eq!(fields.country, "Indonesia");
        assert_eq!(fields.last_name, "Doe");
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let mut fields = created();
        fields.first_name = "Jane".into();
        fields.city = "Jakarta".into();
        let input = ContactInput {
            status: Some("blocked".into()),
            ..ContactInput::default()
        };
        apply(&mut fields, &input).unwrap();
        assert_eq!(fields.first_name, "Jane");
        assert_eq!(fields.city, "Jakarta");
        assert_eq!(fields.status, "blocked");
    }

    #[test]
    fn invalid_status_rejected() {
        let input = ContactInput {
            first_name: Some("Jane".into()),
            status: Some("archived".into()),
            ..ContactInput::default()
        };
        let err = apply(&mut created(), &input).unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref m) if m == "invalid status. must be: active, inactive, or blocked")
        );
    }

    #[test]
    fn empty_email_allowed_malformed_rejected() {
        let mut input = ContactInput {
            first_name: Some("Jane".into()),
            email: Some(String::new()),
            ..ContactInput::default()
        };
        assert!(apply(&mut created(), &input).is_ok());
        input.email = Some("not-an-email".into());
        assert!(apply(&mut created(), &input).is_err());
    }

    #[test]
    fn tags_split_on_commas() {
        assert_eq!(parse_tags(Some("vip, b2b,,")), vec!["vip", "b2b"]);
        assert!(parse_tags(None).is_empty());
    }
}
