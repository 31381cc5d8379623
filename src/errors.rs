use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleRankError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StyleRankError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::StyleRankError;

    #[test]
    fn test_validation_error_display() {
        let error = StyleRankError::Validation("Query cannot be empty".to_string());
        assert_eq!(format!("{}", error), "Validation error: Query cannot be empty");
    }

    #[test]
    fn test_llm_error_display() {
        let error = StyleRankError::Llm("request timed out".to_string());
        assert!(matches!(error, StyleRankError::Llm(_)));
        assert!(format!("{}", error).contains("timed out"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "config not found");
        let err: StyleRankError = io_err.into();
        assert!(matches!(err, StyleRankError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: StyleRankError = json_err.into();
        assert!(matches!(err, StyleRankError::Serialization(_)));
    }
}
