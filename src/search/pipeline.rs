//! Per-request orchestration: embed once, retrieve both partitions, rerank
//! both partitions, assemble the response.

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::models::RankedResult;
use crate::models::StockStatus;
use crate::search::validate::validate_query;
use crate::search::Reranker;
use crate::search::Retriever;

/// Ranked results for both partitions of one request
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub in_stock: Vec<RankedResult>,
    pub out_of_stock: Vec<RankedResult>,
}

/// Complete search service: validation → embedding → retrieval → rerank
pub struct SearchService {
    retriever: Retriever,
    reranker: Reranker,
}

impl SearchService {
    /// Create a new search service
    ///
    /// # Errors
    /// - Database connection errors
    /// - Embedding service configuration errors (invalid provider, endpoint)
    /// - LLM service configuration errors
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let database = Arc::new(Database::from_config(config).await?);
        let embedding_service = Arc::new(EmbeddingService::new(config)?);
        let llm_service = Arc::new(LlmService::new(config)?);
        Ok(Self::from_services(config, database, embedding_service, llm_service))
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        config: &AppConfig,
        database: Arc<Database>,
        embedding_service: Arc<EmbeddingService>,
        llm_service: Arc<LlmService>,
    ) -> Self {
        let retriever = Retriever::new(database, embedding_service, config.max_top_k());
        let reranker = Reranker::new(
            llm_service,
            config.search.rerank_temperature,
            config.search.rerank_top_p,
        );

        Self {
            retriever,
            reranker,
        }
    }

    /// Run a complete search request.
    ///
    /// Embedding and retrieval failures propagate as errors and abort the
    /// request; reranking never fails (it degrades to retrieval order).
    ///
    /// # Errors
    /// - Query validation failures
    /// - Embedding gateway failures
    /// - Similarity store failures (connection, missing partition)
    pub async fn search(&self, query: &str, top_k: i64) -> Result<SearchOutcome> {
        validate_query(query)?;

        info!("Processing search query: {}", query);
        let query_vector = self.retriever.embed_query(query).await?;

        // The two partitions are independent; query them concurrently
        let (in_stock, out_of_stock) = tokio::try_join!(
            self.retriever
                .search(&query_vector, StockStatus::InStock, top_k),
            self.retriever
                .search(&query_vector, StockStatus::OutOfStock, top_k),
        )?;

        debug!(
            "Retrieved {} in-stock and {} out-of-stock candidates",
            in_stock.len(),
            out_of_stock.len()
        );

        // Reranking calls are independent of each other too
        let (ranked_in_stock, ranked_out_of_stock) = tokio::join!(
            self.reranker.rerank(query, in_stock),
            self.reranker.rerank(query, out_of_stock),
        );

        info!(
            "Search completed: {} in-stock, {} out-of-stock results",
            ranked_in_stock.len(),
            ranked_out_of_stock.len()
        );

        Ok(SearchOutcome {
            in_stock: ranked_in_stock,
            out_of_stock: ranked_out_of_stock,
        })
    }

    /// Get retriever reference
    #[must_use]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}
