use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Query};
use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::service::dashboard::{self, DashboardStats, Period};
use crate::store::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: DashboardStats,
    pub period: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

#[tracing::instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant), err)]
async fn stats(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let period = match params.period.as_deref() {
        None | Some("") => Period::default(),
        Some(raw) => raw.parse()?,
    };

    let stats = dashboard::stats(&state.pool, ctx.tenant, period, Utc::now()).await?;

    Ok(Json(StatsResponse {
        stats,
        period: period.as_str(),
    }))
}
