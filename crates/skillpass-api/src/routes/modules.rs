//! Routes for the Module Catalog bounded context.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use tracing::instrument;

use skillpass_catalog::application::query_handlers::{
    self, ModuleDetailView, ModuleSummaryView,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /
async fn list_modules(State(state): State<AppState>) -> Json<Vec<ModuleSummaryView>> {
    Json(query_handlers::list_modules(&state.services.catalog))
}

/// GET /{id_or_slug}
#[instrument(skip(state))]
async fn get_module(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<ModuleDetailView>, ApiError> {
    let view = query_handlers::get_module(&state.services.catalog, &id_or_slug)?;
    Ok(Json(view))
}

/// Returns the router for the catalog context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules))
        .route("/{id_or_slug}", get(get_module))
}
