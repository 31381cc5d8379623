//! API request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;

use crate::api::types::ErrorBody;
use crate::api::types::HealthResponse;
use crate::api::types::SearchRequest;
use crate::api::types::SearchResponse;
use crate::search::validate::validate_top_k;
use crate::search::SearchService;
use crate::StyleRankError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search_service: Arc<SearchService>,
}

/// Health check handler
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Product search (POST /api/search)
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    info!("POST /api/search: {:?} (top_k={:?})", req.query, req.top_k);

    let top_k = match validate_top_k(req.top_k) {
        Ok(top_k) => top_k,
        Err(StyleRankError::Validation(msg)) => {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(msg))));
        }
        Err(e) => {
            error!("Unexpected top_k validation error: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(
                    "Search is temporarily unavailable. Please try again later.",
                )),
            ));
        }
    };

    match state.search_service.search(&req.query, top_k).await {
        Ok(outcome) => Ok(Json(SearchResponse::success(
            outcome.in_stock,
            outcome.out_of_stock,
        ))),
        Err(StyleRankError::Validation(msg)) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(msg))))
        }
        Err(e) => {
            // Internal error text stays in the logs, not in the response
            error!("Error processing search request: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(
                    "Search is temporarily unavailable. Please try again later.",
                )),
            ))
        }
    }
}
