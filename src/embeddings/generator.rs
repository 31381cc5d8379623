use tracing::debug;

use super::client::EmbeddingClient;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::StyleRankError;

/// Embedding gateway used by retrieval and ingestion. One instance per
/// process; the underlying HTTP client pools connections.
pub struct EmbeddingService {
    client: EmbeddingClient,
    dimension: usize,
}

impl EmbeddingService {
    /// Create a new embedding service from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = config.embeddings.provider.parse()?;
        let api_key = if config.embeddings.api_key.is_empty() {
            None
        } else {
            Some(config.embeddings.api_key.clone())
        };

        let client = EmbeddingClient::new(
            provider,
            config.embeddings.model.clone(),
            config.embeddings.endpoint.clone(),
            api_key,
        )?;

        Ok(Self {
            client,
            dimension: config.embedding_dimension(),
        })
    }

    /// Embed a single text into a fixed-dimension vector
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.generate(text).await?;
        self.check_dimension(&embedding)?;
        debug!("Generated embedding of dimension {}", embedding.len());
        Ok(embedding)
    }

    /// Embed multiple texts, preserving input order
    pub async fn generate_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.client.generate_batch(texts).await?;
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }
        Ok(embeddings)
    }

    /// Configured embedding dimension
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(StyleRankError::Embedding(format!(
                "Expected embedding dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(())
    }
}
