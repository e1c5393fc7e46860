pub mod auth;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod extract;
pub mod helpers;
pub mod pipeline;
pub mod tenants;

use axum::Router;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(tenants::router())
        .merge(dashboard::router())
        .merge(contacts::router())
        .merge(pipeline::router())
        .merge(deals::router())
}
