use serde::Deserialize;

use crate::audit::{AuditEntry, write_audit};
use crate::auth::middleware::TenantContext;
use crate::store::{AppState, Page};

/// `?page=&page_size=` of the paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn resolve(&self, default_size: i64) -> Page {
        Page::new(self.page, self.page_size, default_size)
    }
}

/// Record a mutation by the caller. Never fails the request.
pub async fn audit(
    state: &AppState,
    ctx: &TenantContext,
    action: &str,
    resource: &str,
    resource_id: Option<i64>,
) {
    write_audit(
        &state.pool,
        &AuditEntry::by(ctx, action, resource, resource_id),
    )
    .await;
}
