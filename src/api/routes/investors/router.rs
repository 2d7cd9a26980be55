//! Router for the investors API

use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use axum::{Json, Router, extract::Query, extract::State, routing::get};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::investors::select;

type SharedState = Arc<RwLock<AppState>>;

/// List every investor in the dataset
async fn investors(
    State(state): State<SharedState>,
) -> Result<Json<public::InvestorsResponse>, ApiError> {
    let advisor = Arc::clone(
        &state
            .read()
            .map_err(|_| anyhow!("Shared state lock poisoned"))?
            .advisor,
    );
    let investors = advisor.dataset().load().await;

    Ok(Json(public::InvestorsResponse {
        total: investors.len(),
        investors,
    }))
}

/// Draw a fresh set of recommendations without a conversation
async fn recommendations(
    State(state): State<SharedState>,
    Query(params): Query<public::RecommendationsParams>,
) -> Result<Json<public::RecommendationsResponse>, ApiError> {
    let advisor = Arc::clone(
        &state
            .read()
            .map_err(|_| anyhow!("Shared state lock poisoned"))?
            .advisor,
    );
    let pool = advisor.dataset().load().await;
    // Capped at the larger of the pool size and the configured count
    let max_count = pool.len().max(advisor.recommendation_count());
    let count = params
        .count
        .unwrap_or(advisor.recommendation_count())
        .min(max_count);

    Ok(Json(public::RecommendationsResponse {
        recommendations: select(&pool, count),
    }))
}

/// Create the investors router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(investors))
        .route("/recommendations", get(recommendations))
}
