//! Ranger routes under `/ranger`. Static segments take precedence over `/:id`.

use crate::handlers::ranger::{claimed_today, create, delete, list, page_list, patch, read, search};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn ranger_routes(state: AppState) -> Router {
    Router::new()
        .route("/ranger/create", post(create))
        .route("/ranger/page-list", post(page_list))
        .route("/ranger/search", post(search))
        .route("/ranger/list", get(list))
        .route("/ranger/claimed-today", get(claimed_today))
        .route("/ranger/:id", get(read).patch(patch).delete(delete))
        .with_state(state)
}
