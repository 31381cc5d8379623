//! Catalog ingestion: JSONL loading, batch embedding, partitioned insertion
//!
//! The only writer in the system. Products with a price land in the in-stock
//! partition, products without one in the out-of-stock partition; the search
//! path never revisits that decision.

use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use tracing::warn;

use crate::db::Database;
use crate::db::InsertProduct;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::models::StockStatus;

/// Products per embedding API call
const EMBED_BATCH_SIZE: usize = 100;

/// Products per insert transaction
const INSERT_BATCH_SIZE: usize = 1000;

/// One raw catalog row as it appears in the JSONL dump
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogRow {
    pub title: String,
    #[serde(default)]
    pub average_rating: Option<f32>,
    #[serde(default)]
    pub rating_number: Option<i32>,
    #[serde(default)]
    pub features: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub images: Option<serde_json::Value>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub categories: Option<serde_json::Value>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Statistics from one ingest run
#[derive(Debug, Default)]
pub struct IngestStats {
    pub total_rows: usize,
    pub parse_failures: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
    pub inserted: u64,
}

/// Read and parse a JSONL catalog dump. Unparseable lines are counted and
/// skipped, not fatal.
pub fn read_catalog<P: AsRef<Path>>(path: P) -> Result<(Vec<RawCatalogRow>, usize)> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    let mut failures = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawCatalogRow>(&line) {
            Ok(row) if !row.title.trim().is_empty() => rows.push(row),
            Ok(_) => {
                failures += 1;
                warn!("Skipping line {}: empty title", line_no + 1);
            }
            Err(e) => {
                failures += 1;
                warn!("Skipping line {}: {}", line_no + 1, e);
            }
        }
    }

    Ok((rows, failures))
}

/// Parse a raw price field (number or string, possibly "$"-prefixed) into a
/// non-negative decimal. Anything else means no price, hence out-of-stock.
pub fn parse_price(value: Option<&serde_json::Value>) -> Option<Decimal> {
    let price = match value? {
        serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        serde_json::Value::String(s) => s.trim().trim_start_matches('$').parse::<Decimal>().ok(),
        _ => None,
    }?;
    if price.is_sign_negative() {
        None
    } else {
        Some(price)
    }
}

/// Text fed to the embedding model for one product
fn embedding_text(row: &RawCatalogRow) -> String {
    let mut text = row.title.clone();
    if let Some(description) = &row.description {
        text.push(' ');
        text.push_str(&flatten_text(description));
    }
    if let Some(features) = &row.features {
        text.push(' ');
        text.push_str(&flatten_text(features));
    }
    text
}

/// Flatten a string-or-array JSON value into plain text
fn flatten_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn into_insert(row: RawCatalogRow, price: Option<Decimal>, embedding: Vec<f32>) -> InsertProduct {
    InsertProduct {
        title: row.title,
        average_rating: row.average_rating,
        rating_number: row.rating_number,
        features: row.features,
        description: row
            .description
            .as_ref()
            .map(flatten_text)
            .filter(|s| !s.is_empty()),
        price,
        images: row.images,
        store: row.store,
        categories: row.categories.as_ref().map(|v| flatten_text(v)),
        details: row.details,
        embedding,
    }
}

/// Ingest a JSONL catalog dump: embed every row and insert it into its
/// partition.
pub async fn ingest_catalog<P: AsRef<Path>>(
    database: Arc<Database>,
    embedding_service: Arc<EmbeddingService>,
    path: P,
    limit: Option<usize>,
) -> Result<IngestStats> {
    let (mut rows, parse_failures) = read_catalog(path)?;
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    let mut stats = IngestStats {
        total_rows: rows.len(),
        parse_failures,
        ..IngestStats::default()
    };
    info!("Ingesting {} catalog rows ({} skipped at parse)", rows.len(), parse_failures);

    let mut in_stock = Vec::new();
    let mut out_of_stock = Vec::new();

    for (batch_idx, chunk) in rows.chunks(EMBED_BATCH_SIZE).enumerate() {
        info!(
            "Embedding batch {}/{} ({} products)",
            batch_idx + 1,
            rows.len().div_ceil(EMBED_BATCH_SIZE),
            chunk.len()
        );

        let texts: Vec<String> = chunk.iter().map(embedding_text).collect();
        let embeddings = embedding_service
            .generate_batch(texts.iter().map(String::as_str).collect())
            .await?;

        for (row, embedding) in chunk.iter().cloned().zip(embeddings) {
            let price = parse_price(row.price.as_ref());
            let insert = into_insert(row, price, embedding);
            if price.is_some() {
                in_stock.push(insert);
            } else {
                out_of_stock.push(insert);
            }
        }
    }

    stats.in_stock = in_stock.len();
    stats.out_of_stock = out_of_stock.len();

    stats.inserted += database
        .batch_insert_products(&in_stock, StockStatus::InStock, INSERT_BATCH_SIZE)
        .await?;
    stats.inserted += database
        .batch_insert_products(&out_of_stock, StockStatus::OutOfStock, INSERT_BATCH_SIZE)
        .await?;

    info!(
        "Ingest complete: {} in-stock, {} out-of-stock, {} newly inserted",
        stats.in_stock, stats.out_of_stock, stats.inserted
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_price_variants() {
        assert_eq!(parse_price(Some(&json!(19.99))), Decimal::from_f64(19.99));
        assert_eq!(parse_price(Some(&json!("24.50"))), Some("24.50".parse().unwrap()));
        assert_eq!(parse_price(Some(&json!("$12.00"))), Some("12.00".parse().unwrap()));
        assert_eq!(parse_price(Some(&json!("n/a"))), None);
        assert_eq!(parse_price(Some(&json!(null))), None);
        assert_eq!(parse_price(Some(&json!(-5.0))), None);
        assert_eq!(parse_price(None), None);
    }

    #[test]
    fn test_embedding_text_joins_fields() {
        let row = RawCatalogRow {
            title: "Linen Shirt".to_string(),
            average_rating: None,
            rating_number: None,
            features: Some(json!(["breathable", "lightweight"])),
            description: Some(json!("Perfect for summer")),
            price: None,
            images: None,
            store: None,
            categories: None,
            details: None,
        };
        let text = embedding_text(&row);
        assert!(text.contains("Linen Shirt"));
        assert!(text.contains("Perfect for summer"));
        assert!(text.contains("breathable"));
    }

    #[test]
    fn test_read_catalog_skips_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "Shirt A", "price": 10.0}}"#).unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"title": "Shirt B"}}"#).unwrap();
        writeln!(file, r#"{{"title": "  "}}"#).unwrap();

        let (rows, failures) = read_catalog(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(failures, 2);
        assert_eq!(rows[0].title, "Shirt A");
        assert_eq!(rows[1].title, "Shirt B");
    }
}
