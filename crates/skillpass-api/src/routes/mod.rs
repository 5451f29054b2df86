//! Route modules organized by bounded context.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod modules;
pub mod training;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Every route of the service, unlayered and awaiting state.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/modules", modules::router())
        .nest("/api/v1/training", training::router())
}
