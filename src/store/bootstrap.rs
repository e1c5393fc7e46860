use sqlx::PgPool;

use super::TenantId;
use super::stages::{self, StageFields};

pub struct StageDef {
    pub name: &'static str,
    pub probability: i32,
    pub color: &'static str,
    pub is_closed_won: bool,
    pub is_closed_lost: bool,
}

/// Canonical funnel created for every tenant on its first stage listing.
/// Position in this table is the stage `order` (1-based).
pub const DEFAULT_STAGES: &[StageDef] = &[
    StageDef {
        name: "Lead",
        probability: 10,
        color: "#3B82F6",
        is_closed_won: false,
        is_closed_lost: false,
    },
    StageDef {
        name: "Qualified",
        probability: 25,
        color: "#06B6D4",
        is_closed_won: false,
        is_closed_lost: false,
    },
    StageDef {
        name: "Proposal",
        probability: 50,
        color: "#EAB308",
        is_closed_won: false,
        is_closed_lost: false,
    },
    StageDef {
        name: "Negotiation",
        probability: 75,
        color: "#F97316",
        is_closed_won: false,
        is_closed_lost: false,
    },
    StageDef {
        name: "Closed Won",
        probability: 100,
        color: "#10B981",
        is_closed_won: true,
        is_closed_lost: false,
    },
    StageDef {
        name: "Closed Lost",
        probability: 0,
        color: "#EF4444",
        is_closed_won: false,
        is_closed_lost: true,
    },
];

impl StageDef {
    fn fields(&self, order: i32) -> StageFields {
        StageFields {
            name: self.name.into(),
            order,
            probability: self.probability,
            color: self.color.into(),
            is_default: true,
            is_closed_won: self.is_closed_won,
            is_closed_lost: self.is_closed_lost,
        }
    }
}

/// Seed the default stages if the tenant has none. Returns whether it seeded.
///
/// Runs under a transaction-scoped advisory lock keyed on the tenant, so two
/// concurrent first listings serialize and the second one sees the rows the
/// first one committed.
#[tracing::instrument(skip(pool), fields(tenant_id = %tenant), err)]
pub async fn ensure_default_stages(pool: &PgPool, tenant: TenantId) -> Result<bool, sqlx::Error> {
    // Cheap path: most calls find stages already present.
    if stages::count(pool, tenant).await? > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('pipeline_stages'), $1::int4)")
        .bind(advisory_key(tenant))
        .execute(&mut *tx)
        .await?;

    if stages::count(&mut *tx, tenant).await? > 0 {
        tx.commit().await?;
        return Ok(false);
    }

    for (order, def) in (1..).zip(DEFAULT_STAGES) {
        stages::create(&mut *tx, tenant, &def.fields(order)).await?;
    }

    tx.commit().await?;

    tracing::info!(count = DEFAULT_STAGES.len(), "default pipeline stages created");
    Ok(true)
}

/// Fold a tenant id into the 32-bit second half of the advisory lock key.
#[allow(clippy::cast_possible_truncation)]
fn advisory_key(tenant: TenantId) -> i32 {
    let id = tenant.get();
    (id ^ (id >> 32)) as i32
}
