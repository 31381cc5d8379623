use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use stylerank::config::AppConfig;
use stylerank::db::Database;
use stylerank::embeddings::EmbeddingService;
use stylerank::llm::LlmService;
use stylerank::models::StockStatus;
use stylerank::search::SearchService;
use stylerank::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "stylerank")]
#[command(about = "Semantic product search with pgvector retrieval and LLM re-ranking")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Disable permissive CORS
        #[arg(long)]
        no_cors: bool,
    },
    /// Create the partition tables and vector indexes
    InitDb,
    /// Load a JSONL catalog dump into the database
    Ingest {
        /// Path to the JSONL file
        path: String,
        /// Only ingest the first N rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Run a one-off search from the command line
    Search {
        /// Free-text query
        query: String,
        /// Results per partition
        #[arg(short, long, default_value = "10")]
        top_k: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    if cli.verbose {
        stylerank::logging::init_simple_logging()?;
    } else {
        stylerank::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            stylerank::api::serve_api(&config, host, port, !no_cors).await?;
        }
        Commands::InitDb => {
            let database = Database::from_config(&config).await?;
            database.init_schema(config.embedding_dimension()).await?;
            info!("Schema initialized");
        }
        Commands::Ingest { path, limit } => {
            let database = Arc::new(Database::from_config(&config).await?);
            let embedding_service = Arc::new(EmbeddingService::new(&config)?);
            let stats =
                stylerank::ingest::ingest_catalog(database.clone(), embedding_service, &path, limit)
                    .await?;
            println!(
                "Ingested {} rows: {} in-stock, {} out-of-stock, {} inserted, {} parse failures",
                stats.total_rows,
                stats.in_stock,
                stats.out_of_stock,
                stats.inserted,
                stats.parse_failures
            );
            for partition in [StockStatus::InStock, StockStatus::OutOfStock] {
                let count = database.count_products(partition).await?;
                println!("{}: {} products total", partition, count);
            }
        }
        Commands::Search { query, top_k } => {
            let database = Arc::new(Database::from_config(&config).await?);
            let embedding_service = Arc::new(EmbeddingService::new(&config)?);
            let llm_service = Arc::new(LlmService::new(&config)?);
            let service = SearchService::from_services(
                &config,
                database,
                embedding_service,
                llm_service,
            );

            let outcome = service.search(&query, top_k).await?;
            println!("In stock:");
            for result in &outcome.in_stock {
                println!(
                    "  #{} {} (similarity {:.3}, score {})",
                    result.rank.map_or("-".to_string(), |r| r.to_string()),
                    result.product.title,
                    result.similarity.unwrap_or(0.0),
                    result
                        .rerank_score
                        .map_or("-".to_string(), |s| format!("{s:.2}")),
                );
            }
            println!("Out of stock:");
            for result in &outcome.out_of_stock {
                println!(
                    "  #{} {} (similarity {:.3})",
                    result.rank.map_or("-".to_string(), |r| r.to_string()),
                    result.product.title,
                    result.similarity.unwrap_or(0.0),
                );
            }
        }
    }

    Ok(())
}
