use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path, Query};
use crate::api::helpers::audit;
use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::service::deals::{self as deal_service, DealInput, DealListParams};
use crate::store::AppState;
use crate::store::deals::{DealDetail, StageValue};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub stage_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct DealResponse {
    pub deal: DealDetail,
}

#[derive(Debug, Serialize)]
pub struct DealSavedResponse {
    pub message: &'static str,
    pub deal: DealDetail,
}

#[derive(Debug, Serialize)]
pub struct DealListResponse {
    pub deals: Vec<DealDetail>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct PipelineValueResponse {
    pub pipeline_values: Vec<StageValue>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/deals", get(list_deals).post(create_deal))
        .route("/api/deals/pipeline-value", get(pipeline_value))
        .route(
            "/api/deals/{id}",
            get(get_deal).patch(update_deal).delete(delete_deal),
        )
        .route("/api/deals/{id}/move", put(move_deal))
        .route("/api/deals/{id}/status", put(update_status))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn create_deal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<DealInput>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = deal_service::create(&state.pool, ctx.tenant, ctx.user_id, &body).await?;

    audit(&state, &ctx, "create", "deal", Some(deal.deal.id)).await;

    Ok((
        StatusCode::CREATED,
        Json(DealSavedResponse {
            message: "deal created successfully",
            deal,
        }),
    ))
}

async fn get_deal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<DealResponse>, ApiError> {
    let deal = deal_service::get(&state.pool, ctx.tenant, id).await?;
    Ok(Json(DealResponse { deal }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn update_deal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<DealInput>,
) -> Result<Json<DealSavedResponse>, ApiError> {
    let deal = deal_service::update(&state.pool, ctx.tenant, id, &body).await?;

    audit(&state, &ctx, "update", "deal", Some(id)).await;

    Ok(Json(DealSavedResponse {
        message: "deal updated successfully",
        deal,
    }))
}

#[tracing::instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant), err)]
async fn delete_deal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    deal_service::delete(&state.pool, ctx.tenant, id).await?;

    audit(&state, &ctx, "delete", "deal", Some(id)).await;

    Ok(Json(MessageResponse {
        message: "deal deleted successfully",
    }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn move_deal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<DealSavedResponse>, ApiError> {
    if body.stage_id == 0 {
        return Err(ApiError::bad_request("stage_id is required"));
    }
    let deal = deal_service::move_to_stage(&state.pool, ctx.tenant, id, body.stage_id).await?;

    audit(&state, &ctx, "move_stage", "deal", Some(id)).await;

    Ok(Json(DealSavedResponse {
        message: "deal moved successfully",
        deal,
    }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn update_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<DealSavedResponse>, ApiError> {
    let deal = deal_service::update_status(&state.pool, ctx.tenant, id, &body.status).await?;

    audit(&state, &ctx, "update_status", "deal", Some(id)).await;

    Ok(Json(DealSavedResponse {
        message: "deal status updated successfully",
        deal,
    }))
}

async fn list_deals(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<DealListParams>,
) -> Result<Json<DealListResponse>, ApiError> {
    let filter = params.into_filter()?;
    let (deals, total) = deal_service::list(&state.pool, ctx.tenant, &filter).await?;

    Ok(Json(DealListResponse {
        deals,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

async fn pipeline_value(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<PipelineValueResponse>, ApiError> {
    let pipeline_values = deal_service::pipeline_value(&state.pool, ctx.tenant).await?;
    Ok(Json(PipelineValueResponse { pipeline_values }))
}
