use crate::api::models::AppState;
use crate::api::review::handlers::{rate_handler, rating_page_handler};
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/r/{token}", get(rating_page_handler))
        .route("/api/rate", post(rate_handler))
}
