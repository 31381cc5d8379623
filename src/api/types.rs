//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::models::RankedResult;

/// Inbound search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// Outbound search response: both partitions, reranked independently
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: String,
    pub recommended_in_stock_products: Vec<RankedResult>,
    pub recommended_out_of_stock_products: Vec<RankedResult>,
}

impl SearchResponse {
    pub fn success(
        in_stock: Vec<RankedResult>,
        out_of_stock: Vec<RankedResult>,
    ) -> Self {
        Self {
            status: "success".to_string(),
            recommended_in_stock_products: in_stock,
            recommended_out_of_stock_products: out_of_stock,
        }
    }
}

/// Error payload with a human-readable message
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
