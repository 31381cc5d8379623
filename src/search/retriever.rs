//! Retrieval: k-nearest-neighbor search over one catalog partition

use std::sync::Arc;

use tracing::debug;

use crate::db::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::models::SearchCandidate;
use crate::models::StockStatus;

/// Retriever for partitioned semantic product search. Read-only; the two
/// partitions are queried independently and never merged at this layer.
pub struct Retriever {
    database: Arc<Database>,
    embedding_service: Arc<EmbeddingService>,
    max_top_k: i64,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(
        database: Arc<Database>,
        embedding_service: Arc<EmbeddingService>,
        max_top_k: i64,
    ) -> Self {
        Self {
            database,
            embedding_service,
            max_top_k,
        }
    }

    /// Embed the query text. Failures here are fatal to the request.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embedding_service.generate(query).await
    }

    /// Nearest-neighbor search against one partition, ordered strictly
    /// descending by cosine similarity. Returns at most `top_k` candidates,
    /// each tagged with the partition's stock status.
    pub async fn search(
        &self,
        query_vector: &[f32],
        partition: StockStatus,
        top_k: i64,
    ) -> Result<Vec<SearchCandidate>> {
        debug!("Retrieving top {} candidates from {}", top_k, partition);
        self.database
            .search_products(query_vector, partition, top_k, self.max_top_k)
            .await
    }
}
