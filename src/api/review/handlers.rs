use crate::api::models::*;
use crate::reviews;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

/// Data behind the public rating page
pub async fn rating_page_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RatingPageResponse>, AppError> {
    let store = state.store.read().await;
    let page = reviews::lookup(&**store, &token)?;

    Ok(Json(RatingPageResponse { ok: true, page }))
}

pub async fn rate_handler(
    State(state): State<AppState>,
    request: RateRequest,
) -> Result<Json<RateResponse>, AppError> {
    let (token, input) = request.into_input();

    info!(rating = input.rating, "Rating submitted");

    let outcome = {
        let mut store = state.store.write().await;
        reviews::submit_rating(&mut **store, &token, input)?
    };

    Ok(Json(RateResponse {
        ok: true,
        public: outcome.public,
        redirect: outcome.redirect,
    }))
}
