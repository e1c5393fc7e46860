use sqlx::PgPool;

use crate::auth::middleware::TenantContext;
use crate::store::TenantId;
use crate::store::audit_logs::{self, NewAuditLog};

pub struct AuditEntry<'a> {
    pub tenant: TenantId,
    pub user_id: i64,
    pub action: &'a str,
    pub resource: &'a str,
    pub resource_id: Option<i64>,
    pub ip_addr: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

impl<'a> AuditEntry<'a> {
    /// Entry attributed to the caller of a tenant-bound request.
    pub fn by(
        ctx: &'a TenantContext,
        action: &'a str,
        resource: &'a str,
        resource_id: Option<i64>,
    ) -> Self {
        Self {
            tenant: ctx.tenant,
            user_id: ctx.user_id,
            action,
            resource,
            resource_id,
            ip_addr: ctx.ip_addr.as_deref(),
            user_agent: ctx.user_agent.as_deref(),
        }
    }
}

/// Best effort: a failed audit write is logged and never fails the request.
pub async fn write_audit(pool: &PgPool, entry: &AuditEntry<'_>) {
    if let Err(e) = write_audit_inner(pool, entry).await {
        tracing::warn!(
            error = %e,
            action = entry.action,
            resource = entry.resource,
            tenant_id = %entry.tenant,
            "failed to write audit log entry"
        );
    }
}

async fn write_audit_inner(pool: &PgPool, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error> {
    // ip_address is VARCHAR(45), the longest textual IPv6 form.
    let ip = entry.ip_addr.map(|ip| truncate(ip, 45));

    audit_logs::insert(
        pool,
        entry.tenant,
        &NewAuditLog {
            user_id: entry.user_id,
            action: entry.action,
            resource: entry.resource,
            resource_id: entry.resource_id,
            ip_address: ip,
            user_agent: entry.user_agent,
        },
    )
    .await
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
