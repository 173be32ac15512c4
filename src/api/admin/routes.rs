use crate::api::admin::handlers::{dump_handler, send_all_handler, stats_handler, upload_handler};
use crate::api::models::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/send-all", post(send_all_handler))
        .route("/api/_dump", get(dump_handler))
}
