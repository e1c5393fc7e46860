use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path, Query};
use crate::api::helpers::{PageParams, audit};
use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::rbac::middleware::{AdminOnly, AdminOrManager, Authorized};
use crate::service::tenants::{self as tenant_service, AddUserInput, TenantPatch};
use crate::store::AppState;
use crate::store::audit_logs::AuditLog;
use crate::store::memberships::MembershipWithUser;
use crate::store::settings::TenantSetting;
use crate::store::tenants::Tenant;
use crate::store::users::User;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant: Tenant,
}

#[derive(Debug, Serialize)]
pub struct TenantUpdatedResponse {
    pub message: &'static str,
    pub tenant: Tenant,
}

#[derive(Debug, Serialize)]
pub struct UserAddedResponse {
    pub message: &'static str,
    pub user: User,
    pub is_new_user: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleUpdatedResponse {
    pub message: &'static str,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<MembershipWithUser>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLog>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: Vec<TenantSetting>,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub setting: TenantSetting,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tenant", get(get_tenant).put(update_tenant))
        .route("/api/tenant/users", get(list_users).post(add_user))
        .route(
            "/api/tenant/users/{user_id}",
            axum::routing::delete(remove_user),
        )
        .route("/api/tenant/users/{user_id}/role", put(update_role))
        .route("/api/tenant/audit-logs", get(list_audit_logs))
        .route("/api/tenant/settings", get(list_settings))
        .route(
            "/api/tenant/settings/{key}",
            get(get_setting).put(set_setting),
        )
}

// ---------------------------------------------------------------------------
// Tenant handlers
// ---------------------------------------------------------------------------

async fn get_tenant(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = tenant_service::get_tenant(&state.pool, ctx.tenant).await?;
    Ok(Json(TenantResponse { tenant }))
}

#[tracing::instrument(skip(state, auth, body), fields(tenant_id = %auth.tenant), err)]
async fn update_tenant(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Json(body): Json<TenantPatch>,
) -> Result<Json<TenantUpdatedResponse>, ApiError> {
    let tenant = tenant_service::update_tenant(&state.pool, auth.tenant, &body).await?;

    audit(&state, &auth, "update", "tenant", Some(tenant.id)).await;

    Ok(Json(TenantUpdatedResponse {
        message: "tenant updated successfully",
        tenant,
    }))
}

// ---------------------------------------------------------------------------
// Membership handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, auth, body), fields(tenant_id = %auth.tenant), err)]
async fn add_user(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Json(body): Json<AddUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let added = tenant_service::add_user(&state.pool, auth.tenant, &body).await?;

    let action = if added.is_new_user {
        "create_user"
    } else {
        "add_user"
    };
    audit(&state, &auth, action, "user", Some(added.user.id)).await;

    Ok((
        StatusCode::CREATED,
        Json(UserAddedResponse {
            message: "user added to tenant successfully",
            user: added.user,
            is_new_user: added.is_new_user,
        }),
    ))
}

#[tracing::instrument(skip(state, auth, body), fields(tenant_id = %auth.tenant), err)]
async fn update_role(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<RoleUpdatedResponse>, ApiError> {
    let role = tenant_service::update_role(&state.pool, auth.tenant, user_id, &body.role).await?;

    audit(&state, &auth, "update_role", "user", Some(user_id)).await;

    Ok(Json(RoleUpdatedResponse {
        message: "user role updated successfully",
        role,
    }))
}

#[tracing::instrument(skip(state, auth), fields(tenant_id = %auth.tenant), err)]
async fn remove_user(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    tenant_service::remove_user(&state.pool, auth.tenant, user_id).await?;

    audit(&state, &auth, "remove", "user", Some(user_id)).await;

    Ok(Json(MessageResponse {
        message: "user removed from tenant successfully",
    }))
}

async fn list_users(
    State(state): State<AppState>,
    auth: Authorized<AdminOrManager>,
    Query(params): Query<PageParams>,
) -> Result<Json<UsersResponse>, ApiError> {
    let page = params.resolve(10);
    let (users, total) = tenant_service::list_users(&state.pool, auth.tenant, page).await?;

    Ok(Json(UsersResponse {
        users,
        total,
        page: page.page,
        page_size: page.page_size,
    }))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Query(params): Query<PageParams>,
) -> Result<Json<AuditLogsResponse>, ApiError> {
    let page = params.resolve(20);
    let (logs, total) = tenant_service::list_audit_logs(&state.pool, auth.tenant, page).await?;

    Ok(Json(AuditLogsResponse {
        logs,
        total,
        page: page.page,
        page_size: page.page_size,
    }))
}

// ---------------------------------------------------------------------------
// Settings handlers
// ---------------------------------------------------------------------------

async fn list_settings(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = tenant_service::list_settings(&state.pool, ctx.tenant).await?;
    Ok(Json(SettingsResponse { settings }))
}

async fn get_setting(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(key): Path<String>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = tenant_service::get_setting(&state.pool, ctx.tenant, &key).await?;
    Ok(Json(SettingResponse { setting }))
}

#[tracing::instrument(skip(state, auth, body), fields(tenant_id = %auth.tenant), err)]
async fn set_setting(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(key): Path<String>,
    Json(body): Json<SetSettingRequest>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = tenant_service::set_setting(&state.pool, auth.tenant, &key, &body.value).await?;

    audit(&state, &auth, "update", "setting", None).await;

    Ok(Json(SettingResponse { setting }))
}
