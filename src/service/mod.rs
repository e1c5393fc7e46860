//! Validate-then-persist flows behind the HTTP handlers.
//!
//! Every function takes the pool and, for tenant data, the caller's
//! [`TenantId`](crate::store::TenantId); tenant ids are never read from input.

pub mod auth;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod stages;
pub mod tenants;
