use serde::Deserialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::store::bootstrap;
use crate::store::deals;
use crate::store::stages::{self, Stage, StageFields};
use crate::store::TenantId;
use crate::validation;

const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Default, Deserialize)]
pub struct StageInput {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub probability: Option<i32>,
    pub color: Option<String>,
    pub is_closed_won: Option<bool>,
    pub is_closed_lost: Option<bool>,
}

fn apply(fields: &mut StageFields, input: &StageInput) -> Result<(), ApiError> {
    if let Some(name) = &input.name {
        validation::check_required(name, "stage name is required", "stage name", 100)?;
        name.trim().clone_into(&mut fields.name);
    }
    if let Some(probability) = input.probability {
        validation::check_probability(probability)?;
        fields.probability = probability;
    }
    if let Some(order) = input.order {
        if order < 0 {
            return Err(ApiError::bad_request("order must not be negative"));
        }
        fields.order = order;
    }
    if let Some(color) = input.color.as_deref().map(str::trim) {
        validation::check_length("color", color, 0, 20)?;
        color.clone_into(&mut fields.color);
    }
    if let Some(won) = input.is_closed_won {
        fields.is_closed_won = won;
    }
    if let Some(lost) = input.is_closed_lost {
        fields.is_closed_lost = lost;
    }

    if fields.name.is_empty() {
        return Err(ApiError::bad_request("stage name is required"));
    }
    if fields.color.is_empty() {
        fields.color = DEFAULT_COLOR.into();
    }
    if fields.is_closed_won && fields.is_closed_lost {
        return Err(ApiError::bad_request(
            "stage cannot be both closed won and closed lost",
        ));
    }
    Ok(())
}

async fn ensure_order_free(
    pool: &PgPool,
    tenant: TenantId,
    order: i32,
    except: Option<i64>,
) -> Result<(), ApiError> {
    if stages::order_taken(pool, tenant, order, except).await? {
        return Err(ApiError::bad_request(format!(
            "order {order} is already used by another stage"
        )));
    }
    Ok(())
}

/// All stages in pipeline order, seeding the defaults for a tenant that has
/// none yet.
pub async fn list(pool: &PgPool, tenant: TenantId) -> Result<Vec<Stage>, ApiError> {
    bootstrap::ensure_default_stages(pool, tenant).await?;
    Ok(stages::list(pool, tenant).await?)
}

pub async fn get(pool: &PgPool, tenant: TenantId, id: i64) -> Result<Stage, ApiError> {
    stages::find(pool, tenant, id)
        .await?
        .ok_or_else(|| ApiError::not_found("stage not found"))
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn create(pool: &PgPool, tenant: TenantId, input: &StageInput) -> Result<Stage, ApiError> {
    let mut fields = StageFields {
        name: String::new(),
        order: 0,
        probability: 0,
        color: String::new(),
        is_default: false,
        is_closed_won: false,
        is_closed_lost: false,
    };
    apply(&mut fields, input)?;

    if fields.order == 0 {
        fields.order = stages::max_order(pool, tenant).await? + 1;
    } else {
        ensure_order_free(pool, tenant, fields.order, None).await?;
    }

    Ok(stages::create(pool, tenant, &fields).await?)
}

#[tracing::instrument(skip(pool, input), fields(tenant_id = %tenant), err)]
pub async fn update(
    pool: &PgPool,
    tenant: TenantId,
    id: i64,
    input: &StageInput,
) -> Result<Stage, ApiError> {
    let current = get(pool, tenant, id).await?;
    let current_order = current.order;
    let mut fields = StageFields::from(current);
    apply(&mut fields, input)?;

    // "order" is a positive position; 0 means leave it where it is.
    if fields.order == 0 {
        fields.order = current_order;
    } else if fields.order != current_order {
        ensure_order_free(pool, tenant, fields.order, Some(id)).await?;
    }

    stages::update(pool, tenant, id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("stage not found"))
}

#[tracing::instrument(skip(pool), fields(tenant_id = %tenant), err)]
pub async fn delete(pool: &PgPool, tenant: TenantId, id: i64) -> Result<(), ApiError> {
    get(pool, tenant, id).await?;

    if deals::count_in_stage(pool, tenant, id).await? > 0 {
        return Err(ApiError::bad_request(
            "cannot delete stage with existing deals",
        ));
    }

    if !stages::soft_delete(pool, tenant, id).await? {
        return Err(ApiError::not_found("stage not found"));
    }
    Ok(())
}

/// Assign `order = position + 1` to each id, all or nothing.
#[tracing::instrument(skip(pool), fields(tenant_id = %tenant), err)]
pub async fn reorder(pool: &PgPool, tenant: TenantId, stage_ids: &[i64]) -> Result<Vec<Stage>, ApiError> {
    if stage_ids.is_empty() {
        return Err(ApiError::bad_request("stage_ids cannot be empty"));
    }

    let mut tx = pool.begin().await?;

    let found = stages::count_existing(&mut *tx, tenant, stage_ids).await?;
    if usize::try_from(found).ok() != Some(stage_ids.len()) {
        return Err(ApiError::bad_request("one or more stages not found"));
    }

    for (order, id) in (1..).zip(stage_ids) {
        stages::set_order(&mut *tx, tenant, *id, order).await?;
    }

    let reordered = stages::list(&mut *tx, tenant).await?;
    tx.commit().await?;

    Ok(reordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> StageFields {
        StageFields {
            name: String::new(),
            order: 0,
            probability: 0,
            color: String::new(),
            is_default: false,
            is_closed_won: false,
            is_closed_lost: false,
        }
    }

    fn named(name: &str) -> StageInput {
        StageInput {
            name: Some(name.into()),
            ..StageInput::default()
        }
    }

    #[test]
    fn name_required() {
        let err = apply(&mut blank(), &StageInput::default()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "stage name is required"));
    }

    #[test]
    fn blank_color_gets_default() {
        let mut fields = blank();
        apply(&mut fields, &named("Discovery")).unwrap();
        assert_eq!(fields.color, "#3B82F6");
    }

    #[test]
    fn probability_out_of_range() {
        let input = StageInput {
            probability: Some(150),
            ..named("Discovery")
        };
        let err = apply(&mut blank(), &input).unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref m) if m == "probability must be between 0 and 100")
        );
    }

    #[test]
    fn both_closed_flags_rejected() {
        let input = StageInput {
            is_closed_won: Some(true),
            is_closed_lost: Some(true),
            ..named("Done")
        };
        assert!(apply(&mut blank(), &input).is_err());
    }

    #[test]
    fn patch_keeps_existing_values() {
        let mut fields = StageFields {
            name: "Lead".into(),
            order: 1,
            probability: 10,
            color: "#6B7280".into(),
            is_default: true,
            ..blank()
        };
        let input = StageInput {
            probability: Some(15),
            ..StageInput::default()
        };
        apply(&mut fields, &input).unwrap();
        assert_eq!(fields.name, "Lead");
        assert_eq!(fields.probability, 15);
        assert_eq!(fields.color, "#6B7280");
        assert!(fields.is_default);
    }
}
