use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::store::contacts;
use crate::store::deals::{self, Deal, DealDetail, DealFields, DealFilter, DealSort, StageValue};
use crate::store::stages::{self, Stage};
use crate::store::TenantId;
use crate::validation;

const DEFAULT_CURRENCY: &str = "IDR";
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Deal body for both create and partial update.
#[derive(Debug, Default, Deserialize)]
pub struct DealInput {
    /// `0` detaches the deal from its contact.
    pub contact_id: Option<i64>,
    pub stage_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub currency: Option<String>,
    pub stage_order: Option<i32>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub loss_reason: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Query string of the deal listing.
#[derive(Debug, Default, Deserialize)]
pub struct DealListParams {
    pub stage_id: Option<i64>,
    pub status: Option<String>,
    pub contact_id: Option<i64>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub expected_close_start: Option<NaiveDate>,
    pub expected_close_end: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl DealListParams {
    pub fn into_filter(self) -> Result<DealFilter, ApiError> {
        let descending = match self.sort_order.as_deref() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(_) => return Err(ApiError::bad_request("sort_order must be asc or desc")),
        };
        let sort = match self.sort_by.as_deref() {
            None | Some("") => DealSort::new("created_at", descending),
            Some(column) => DealSort::new(column, descending),
        }
        .ok_or_else(|| ApiError::bad_request("invalid sort_by column"))?;

        let limit = match self.limit {
            Some(n) if n > 0 => n.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };

        Ok(DealFilter {
            stage_id: self.stage_id,
            status: self.status.filter(|s| !s.is_empty()),
            contact_id: self.contact_id,
            min_value: self.min_value,
            max_value: self.max_value,
            expected_close_start: self.expected_close_start,
            expected_close_end: self.expected_close_end,
            search: self
                .search
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            sort,
            limit,
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

fn set(target: &mut String, value: Option<&String>) {
    if let Some(v) = value {
        v.trim().clone_into(target);
    }
}

/// Overlay the scalar fields of `input`. Stage and contact references are
/// resolved by the caller since they need the database.
fn apply(fields: &mut DealFields, input: &DealInput) -> Result<(), ApiError> {
    if let Some(title) = &input.title {
        validation::check_required(title, "deal title is required", "title", 255)?;
    }
    if let Some(value) = input.value
        && value < Decimal::ZERO
    {
        return Err(ApiError::bad_request("value must not be negative"));
    }
    if let Some(probability) = input.probability {
        validation::check_probability(probability)?;
    }
    if let Some(status) = &input.status {
        validation::check_deal_status(status)?;
    }
    if let Some(tags) = &input.tags {
        validation::check_tags(tags)?;
    }

    set(&mut fields.title, input.title.as_ref());
    set(&mut fields.description, input.description.as_ref());
    set(&mut fields.currency, input.currency.as_ref());
    set(&mut fields.status, input.status.as_ref());
    set(&mut fields.loss_reason, input.loss_reason.as_ref());
    set(&mut fields.source, input.source.as_ref());
    set(&mut fields.notes, input.notes.as_ref());
    if let Some(value) = input.value {
        fields.value = value;
    }
    if let Some(stage_order) = input.stage_order {
        fields.stage_order = stage_order;
    }
    if let Some(probability) = input.probability {
        fields.probability = probability;
    }
    if input.expected_close_date.is_some() {
        fields.expected_close_date = input.expected_close_date;
    }
    if input.actual_close_date.is_some() {
        fields.actual_close_date = input.actual_close_date;
    }
    if let Some(tags) = &input.tags {
        fields.tags.clone_from(tags);
    }

    if fields.title.is_empty() {
        return Err(ApiError::bad_request("deal title is required"));
    }
    if fields.currency.is_empty() {
        fields.currency = DEFAULT_CURRENCY.into();
    }
    Ok(())
}

async fn require_stage(pool: &PgPool, tenant: TenantId, stage_id: i64) -> Result<Stage, ApiError> {
    stages::find(pool, tenant, stage_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid stage_id: stage not found"))
}

async fn require_contact(pool: &PgPool, tenant: TenantId, contact_id: i64) -> Result<(), ApiError> {
    if !contacts::exists(pool, tenant, contact_id).await? {
        return Err(ApiError::bad_request("invalid contact_id: contact not found"));
    }
    Ok(())
}

async fn find_deal(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Deal, ApiError> {
    deals::find(pool, tenant, id)
        .await?
        .ok_or_else(|| ApiError::not_found("deal not found"))
}

/// Load the stage and contact a deal points at.
async fn detail(pool: &PgPool, tenant: TenantId, deal: Deal) -> Result<DealDetail, ApiError> {
    let stage = stages::find(pool, tenant, deal.stage_id).await?;
    let contact = match deal.contact_id {
        Some(id) => contacts::find(pool, tenant, id).await?,
        None => None,
    };
    Ok(DealDetail {
        deal,
        stage,
        contact,
    })
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn create(
    pool: &PgPool,
    tenant: TenantId,
    created_by: i64,
    input: &DealInput,
) -> Result<DealDetail, ApiError> {
    let stage_id = input
        .stage_id
        .filter(|id| *id != 0)
        .ok_or_else(|| ApiError::bad_request("stage_id is required"))?;

    let mut fields = DealFields {
        contact_id: None,
        stage_id,
        title: String::new(),
        description: String::new(),
        value: Decimal::ZERO,
        currency: DEFAULT_CURRENCY.into(),
        stage_order: 0,
        probability: 0,
        expected_close_date: None,
        actual_close_date: None,
        status: "active".into(),
        loss_reason: String::new(),
        source: String::new(),
        tags: Vec::new(),
        notes: String::new(),
    };
    apply(&mut fields, input)?;

    let stage = require_stage(pool, tenant, stage_id).await?;
    if input.probability.is_none() {
        fields.probability = stage.probability;
    }
    if let Some(contact_id) = input.contact_id.filter(|id| *id != 0) {
        require_contact(pool, tenant, contact_id).await?;
        fields.contact_id = Some(contact_id);
    }

    let deal = deals::create(pool, tenant, created_by, &fields).await?;
    detail(pool, tenant, deal).await
}

pub async fn get(pool: &PgPool, tenant: TenantId, id: i64) -> Result<DealDetail, ApiError> {
    let deal = find_deal(pool, tenant, id).await?;
    detail(pool, tenant, deal).await
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    input: &DealInput,
) -> Result<DealDetail, ApiError> {
    let current = find_deal(pool, tenant, id).await?;
    let mut fields = DealFields::from(current);
    apply(&mut fields, input)?;

    if let Some(stage_id) = input.stage_id.filter(|s| *s != 0 && *s != fields.stage_id) {
        let stage = require_stage(pool, tenant, stage_id).await?;
        fields.stage_id = stage.id;
        if input.probability.is_none() {
            fields.probability = stage.probability;
        }
    }

    match input.contact_id {
        Some(0) => fields.contact_id = None,
        Some(contact_id) if fields.contact_id != Some(contact_id) => {
            require_contact(pool, tenant, contact_id).await?;
            fields.contact_id = Some(contact_id);
        }
        _ => {}
    }

    let deal = deals::update(pool, tenant, id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("deal not found"))?;
    detail(pool, tenant, deal).await
}

pub async fn delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<(), ApiError> {
    if !deals::soft_delete(pool, tenant, id).await? {
        return Err(ApiError::not_found("deal not found"));
    }
    Ok(())
}

/// Status a deal takes on when it lands in `stage`, if any.
fn closing_status(stage: &Stage) -> Option<&'static str> {
    if stage.is_closed_won {
        Some("won")
    } else if stage.is_closed_lost {
        Some("lost")
    } else {
        None
    }
}

#[tracing::instrument(skip(pool), fields(tenant_id = %tenant), err)]
pub async fn move_to_stage(
    pool: &PgPool,
    tenant: TenantId,
    deal_id: i64,
    stage_id: i64,
) -> Result<DealDetail, ApiError> {
    find_deal(pool, tenant, deal_id).await?;
    let stage = require_stage(pool, tenant, stage_id).await?;

    if !deals::move_to_stage(pool, tenant, deal_id, &stage, closing_status(&stage)).await? {
        return Err(ApiError::not_found("deal not found"));
    }

    get(pool, tenant, deal_id).await
}

#[tracing::instrument(skip(pool), fields(tenant_id = %tenant), err)]
pub async fn update_status(
    pool: &PgPool,
    tenant: TenantId,
    deal_id: i64,
    status: &str,
) -> Result<DealDetail, ApiError> {
    validation::check_deal_status(status)?;
    if !deals::update_status(pool, tenant, deal_id, status).await? {
        return Err(ApiError::not_found("deal not found"));
    }
    get(pool, tenant, deal_id).await
}

/// One page of deals, each with its stage and contact.
pub async fn list(
    pool: &PgPool,
    tenant: TenantId,
    filter: &DealFilter,
) -> Result<(Vec<DealDetail>, i64), ApiError> {
    let (items, total) = deals::list(pool, tenant, filter).await?;

    let stages: HashMap<i64, Stage> = stages::list(pool, tenant)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut contact_ids: Vec<i64> = items.iter().filter_map(|d| d.contact_id).collect();
    contact_ids.sort_unstable();
    contact_ids.dedup();
    let contacts: HashMap<i64, contacts::Contact> = if contact_ids.is_empty() {
        HashMap::new()
    } else {
        contacts::find_many(pool, tenant, &contact_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let details = items
        .into_iter()
        .map(|deal| DealDetail {
            stage: stages.get(&deal.stage_id).cloned(),
            contact: deal.contact_id.and_then(|id| contacts.get(&id).cloned()),
            deal,
        })
        .collect();

    Ok((details, total))
}

pub async fn pipeline_value(pool: &PgPool, tenant: TenantId) -> Result<Vec<StageValue>, ApiError> {
    Ok(deals::value_by_stage(pool, tenant).await?)
}
