use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path};
use crate::api::helpers::audit;
use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::service::stages::{self as stage_service, StageInput};
use crate::store::AppState;
use crate::store::stages::Stage;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub stage_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct StagesResponse {
    pub stages: Vec<Stage>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub stage: Stage,
}

#[derive(Debug, Serialize)]
pub struct StageSavedResponse {
    pub message: &'static str,
    pub stage: Stage,
}

#[derive(Debug, Serialize)]
pub struct ReorderedResponse {
    pub message: &'static str,
    pub stages: Vec<Stage>,
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
        .route("/api/pipeline/stages", get(list_stages).post(create_stage))
        .route("/api/pipeline/stages/reorder", put(reorder_stages))
        .route(
            "/api/pipeline/stages/{id}",
            get(get_stage).patch(update_stage).delete(delete_stage),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_stages(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<StagesResponse>, ApiError> {
    let stages = stage_service::list(&state.pool, ctx.tenant).await?;
    Ok(Json(StagesResponse {
        total: stages.len(),
        stages,
    }))
}

async fn get_stage(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<StageResponse>, ApiError> {
    let stage = stage_service::get(&state.pool, ctx.tenant, id).await?;
    Ok(Json(StageResponse { stage }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn create_stage(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<StageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = stage_service::create(&state.pool, ctx.tenant, &body).await?;

    audit(&state, &ctx, "create", "pipeline_stage", Some(stage.id)).await;

    Ok((
        StatusCode::CREATED,
        Json(StageSavedResponse {
            message: "stage created successfully",
            stage,
        }),
    ))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn update_stage(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<StageInput>,
) -> Result<Json<StageSavedResponse>, ApiError> {
    let stage = stage_service::update(&state.pool, ctx.tenant, id, &body).await?;

    audit(&state, &ctx, "update", "pipeline_stage", Some(id)).await;

    Ok(Json(StageSavedResponse {
        message: "stage updated successfully",
        stage,
    }))
}

#[tracing::instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant), err)]
async fn delete_stage(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    stage_service::delete(&state.pool, ctx.tenant, id).await?;

    audit(&state, &ctx, "delete", "pipeline_stage", Some(id)).await;

    Ok(Json(MessageResponse {
        message: "stage deleted successfully",
    }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn reorder_stages(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<ReorderedResponse>, ApiError> {
    let stages = stage_service::reorder(&state.pool, ctx.tenant, &body.stage_ids).await?;

    audit(&state, &ctx, "reorder", "pipeline_stage", None).await;

    Ok(Json(ReorderedResponse {
        message: "stages reordered successfully",
        stages,
    }))
}
