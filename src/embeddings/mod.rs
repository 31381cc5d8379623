//! Embedding generation for queries and catalog text

mod client;
mod generator;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;
