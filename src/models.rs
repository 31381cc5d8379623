use serde::Deserialize;
use serde::Serialize;

/// Catalog partition a product belongs to. Decided at ingestion time by the
/// presence of a price and never mutated by the search path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical catalog entity. Read-only during search; every field on a final
/// result except the rerank overlay originates here, never from LLM output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub title: String,
    pub average_rating: Option<f32>,
    pub rating_number: Option<i32>,
    pub features: Option<serde_json::Value>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub images: Option<serde_json::Value>,
    pub store: Option<String>,
    pub categories: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// A ProductRecord enriched with retrieval metadata. Created per request by
/// the retriever, discarded after the response is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub similarity: Option<f64>,
    pub stock_status: StockStatus,
}

/// One entry of the LLM's proposed ordering. `id` is untyped JSON because the
/// model echoes identifiers as either strings or numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct RerankEntry {
    pub id: serde_json::Value,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub rerank_score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The LLM's full response. Ephemeral, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RerankDirective {
    pub reranked_results: Vec<RerankEntry>,
    #[serde(default)]
    pub query_understanding: Option<String>,
}

/// A ProductRecord merged with the rerank overlay. The unit returned to the
/// caller, ordered ascending by rank. Overlay fields are None when reranking
/// fell back to retrieval order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub similarity: Option<f64>,
    pub stock_status: StockStatus,
    pub rank: Option<i64>,
    pub rerank_score: Option<f64>,
    pub reason: Option<String>,
}

impl RankedResult {
    /// Wrap a candidate without rerank metadata (fallback order).
    pub fn unranked(candidate: SearchCandidate) -> Self {
        Self {
            product: candidate.product,
            similarity: candidate.similarity,
            stock_status: candidate.stock_status,
            rank: None,
            rerank_score: None,
            reason: None,
        }
    }

    /// Merge a directive entry onto the authoritative candidate data.
    pub fn from_directive(candidate: &SearchCandidate, entry: &RerankEntry) -> Self {
        Self {
            product: candidate.product.clone(),
            similarity: candidate.similarity,
            stock_status: candidate.stock_status,
            rank: Some(entry.rank),
            rerank_score: entry.rerank_score,
            reason: entry.reason.clone(),
        }
    }
}

/// Normalize an untyped directive identifier to its canonical string form.
/// Strings are trimmed; integral numbers use their decimal rendering.
pub fn normalize_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Number(n) => n.as_i64().map(|v| v.to_string()),
        _ => None,
    }
}

/// Second-pass coercion: parse an already-normalized key as an integer so
/// that "42" and 42 resolve to the same candidate.
pub fn coerce_numeric_id(key: &str) -> Option<i64> {
    key.parse::<i64>().ok()
}

/// Replace non-finite floats with None so NaN never reaches serialization.
pub fn sanitize_f64(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// See [`sanitize_f64`].
pub fn sanitize_f32(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_product(id: i64, title: &str) -> ProductRecord {
        ProductRecord {
            id,
            title: title.to_string(),
            average_rating: Some(4.5),
            rating_number: Some(120),
            features: Some(json!(["cotton", "machine washable"])),
            description: Some("A shirt".to_string()),
            price: Some(19.99),
            images: None,
            store: Some("Acme".to_string()),
            categories: Some("Shirts".to_string()),
            details: json!({"brand": "Acme"}),
        }
    }

    #[test]
    fn test_stock_status_serde() {
        assert_eq!(serde_json::to_string(&StockStatus::InStock).unwrap(), "\"in_stock\"");
        assert_eq!(
            serde_json::from_str::<StockStatus>("\"out_of_stock\"").unwrap(),
            StockStatus::OutOfStock
        );
    }

    #[test]
    fn test_normalize_id_string_and_number() {
        assert_eq!(normalize_id(&json!("42")), Some("42".to_string()));
        assert_eq!(normalize_id(&json!(" 42 ")), Some("42".to_string()));
        assert_eq!(normalize_id(&json!(42)), Some("42".to_string()));
        assert_eq!(normalize_id(&json!("")), None);
        assert_eq!(normalize_id(&json!(null)), None);
        assert_eq!(normalize_id(&json!(4.2)), None);
    }

    #[test]
    fn test_coerce_numeric_id() {
        assert_eq!(coerce_numeric_id("42"), Some(42));
        assert_eq!(coerce_numeric_id("042"), Some(42));
        assert_eq!(coerce_numeric_id("B07XYZ"), None);
    }

    #[test]
    fn test_sanitize_non_finite() {
        assert_eq!(sanitize_f64(Some(f64::NAN)), None);
        assert_eq!(sanitize_f64(Some(f64::INFINITY)), None);
        assert_eq!(sanitize_f64(Some(0.9)), Some(0.9));
        assert_eq!(sanitize_f64(None), None);
        assert_eq!(sanitize_f32(Some(f32::NAN)), None);
    }

    #[test]
    fn test_unranked_result_has_default_overlay() {
        let candidate = SearchCandidate {
            product: sample_product(1, "Red Shirt"),
            similarity: Some(0.9),
            stock_status: StockStatus::InStock,
        };
        let result = RankedResult::unranked(candidate.clone());
        assert_eq!(result.product, candidate.product);
        assert_eq!(result.similarity, Some(0.9));
        assert_eq!(result.rank, None);
        assert_eq!(result.rerank_score, None);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_ranked_result_serializes_flat() {
        let candidate = SearchCandidate {
            product: sample_product(7, "Blue Shirt"),
            similarity: Some(0.8),
            stock_status: StockStatus::OutOfStock,
        };
        let entry = RerankEntry {
            id: json!("7"),
            rank: 1,
            rerank_score: Some(0.95),
            reason: Some("color match".to_string()),
        };
        let result = RankedResult::from_directive(&candidate, &entry);
        let value = serde_json::to_value(&result).unwrap();
        // Flattened product fields plus overlay in one object
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["title"], json!("Blue Shirt"));
        assert_eq!(value["stock_status"], json!("out_of_stock"));
        assert_eq!(value["rank"], json!(1));
        assert_eq!(value["reason"], json!("color match"));
    }

    #[test]
    fn test_directive_parses_with_missing_optional_fields() {
        let raw = r#"{"reranked_results": [{"id": "3", "rank": 1}]}"#;
        let directive: RerankDirective = serde_json::from_str(raw).unwrap();
        assert_eq!(directive.reranked_results.len(), 1);
        assert_eq!(directive.reranked_results[0].rerank_score, None);
        assert_eq!(directive.reranked_results[0].reason, None);
    }
}
