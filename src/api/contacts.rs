use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path, Query};
use crate::api::helpers::audit;
use crate::auth::middleware::TenantContext;
use crate::error::ApiError;
use crate::service::contacts::{self as contact_service, ContactInput, parse_tags};
use crate::store::contacts::{Contact, ContactFilter};
use crate::store::{AppState, Page};

const DEFAULT_PAGE_SIZE: i64 = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListContactsParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    /// Comma separated; every tag must be present.
    pub tags: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: Contact,
}

#[derive(Debug, Serialize)]
pub struct ContactSavedResponse {
    pub message: &'static str,
    pub contact: Contact,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ContactSearchResponse {
    pub contacts: Vec<Contact>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub query: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/search", get(search_contacts))
        .route(
            "/api/contacts/{id}",
            get(get_contact)
                .patch(update_contact)
                .delete(delete_contact),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn create_contact(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<ContactInput>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = contact_service::create(&state.pool, ctx.tenant, ctx.user_id, &body).await?;

    audit(&state, &ctx, "create", "contact", Some(contact.id)).await;

    Ok((
        StatusCode::CREATED,
        Json(ContactSavedResponse {
            message: "contact created successfully",
            contact,
        }),
    ))
}

async fn get_contact(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<ContactResponse>, ApiError> {
    let contact = contact_service::get(&state.pool, ctx.tenant, id).await?;
    Ok(Json(ContactResponse { contact }))
}

#[tracing::instrument(skip(state, ctx, body), fields(tenant_id = %ctx.tenant), err)]
async fn update_contact(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<ContactInput>,
) -> Result<Json<ContactSavedResponse>, ApiError> {
    let contact = contact_service::update(&state.pool, ctx.tenant, id, &body).await?;

    audit(&state, &ctx, "update", "contact", Some(id)).await;

    Ok(Json(ContactSavedResponse {
        message: "contact updated successfully",
        contact,
    }))
}

#[tracing::instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant), err)]
async fn delete_contact(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    contact_service::delete(&state.pool, ctx.tenant, id).await?;

    audit(&state, &ctx, "delete", "contact", Some(id)).await;

    Ok(Json(MessageResponse {
        message: "contact deleted successfully",
    }))
}

async fn list_contacts(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<ListContactsParams>,
) -> Result<Json<ContactListResponse>, ApiError> {
    let page = Page::new(params.page, params.page_size, DEFAULT_PAGE_SIZE);
    let filter = ContactFilter {
        search: non_empty(params.search),
        status: non_empty(params.status),
        source: non_empty(params.source),
        city: non_empty(params.city),
        province: non_empty(params.province),
        tags: parse_tags(params.tags.as_deref()),
    };

    let (contacts, total) = contact_service::list(&state.pool, ctx.tenant, &filter, page).await?;

    Ok(Json(ContactListResponse {
        contacts,
        total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages(total),
    }))
}

async fn search_contacts(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<ContactSearchResponse>, ApiError> {
    let page = Page::new(params.page, params.page_size, DEFAULT_PAGE_SIZE);
    let query = params.q.unwrap_or_default();

    let (contacts, total) = contact_service::search(&state.pool, ctx.tenant, &query, page).await?;

    Ok(Json(ContactSearchResponse {
        contacts,
        total,
        page: page.page,
        page_size: page.page_size,
        query,
    }))
}
