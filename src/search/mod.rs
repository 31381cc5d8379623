//! Search core: query validation, partition retrieval, LLM re-ranking, and
//! per-request orchestration.
//!
//! The retrieval side is trusted: candidates come straight from the catalog
//! with authoritative attributes. The re-ranking side is advisory: the LLM
//! proposes an ordering which is validated against the retrieved set before
//! anything reaches the response.

pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod validate;

pub use pipeline::SearchOutcome;
pub use pipeline::SearchService;
pub use reranker::Reranker;
pub use retriever::Retriever;
pub use validate::validate_query;
pub use validate::validate_top_k;
pub use validate::DEFAULT_TOP_K;
