pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod search;

pub use config::AppConfig;
pub use errors::*;
