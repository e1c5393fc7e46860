use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::api::extract::{Json, Path};
use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::service::auth::{self as auth_service, LoginInput, RegisterInput};
use crate::store::AppState;
use crate::store::memberships::MembershipWithTenant;
use crate::store::tenants::Tenant;
use crate::store::users::User;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: User,
    pub tenant: Tenant,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: User,
    pub token: String,
    pub tenant_id: i64,
    pub role: Role,
    pub available_tenants: Vec<MembershipWithTenant>,
}

#[derive(Debug, Serialize)]
pub struct TenantsResponse {
    pub tenants: Vec<MembershipWithTenant>,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub message: &'static str,
    pub token: String,
    pub tenant_id: i64,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/tenants/my", get(my_tenants))
        .route("/api/tenants/switch/{tenant_id}", post(switch_tenant))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let registered = auth_service::register(&state.pool, &state.config, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registration successful",
            user: registered.user,
            tenant: registered.tenant,
            token: registered.token,
        }),
    ))
}

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let logged_in = auth_service::login(&state.pool, &state.config, &body).await?;

    Ok(Json(LoginResponse {
        message: "login successful",
        user: logged_in.user,
        token: logged_in.token,
        tenant_id: logged_in.tenant_id,
        role: logged_in.role,
        available_tenants: logged_in.available_tenants,
    }))
}

async fn my_tenants(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TenantsResponse>, ApiError> {
    let tenants = auth_service::my_tenants(&state.pool, auth.user_id).await?;
    Ok(Json(TenantsResponse { tenants }))
}

#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id), err)]
async fn switch_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<i64>,
) -> Result<Json<SwitchResponse>, ApiError> {
    let switched = auth_service::switch_tenant(
        &state.pool,
        &state.config,
        auth.user_id,
        &auth.email,
        tenant_id,
    )
    .await?;

    Ok(Json(SwitchResponse {
        message: "tenant switched successfully",
        token: switched.token,
        tenant_id: switched.tenant_id,
        role: switched.role,
    }))
}
