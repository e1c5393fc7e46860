use std::fmt;

use serde::Serialize;

/// Identifier of the tenant a request is bound to.
///
/// Every tenant-scoped repository function takes a `TenantId` and filters on
/// it. Values are only minted from a verified session token or from a tenant
/// row created inside the current transaction, so a handler cannot reach
/// tenant data with an id lifted from the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TenantId(i64);

impl TenantId {
    pub(crate) fn trusted(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
