//! LLM re-ranking of retrieved candidates
//!
//! The generative collaborator is untrusted for identity and schema but
//! trusted for ordering judgment. Every field on a final result except
//! rank/rerank_score/reason comes from the authoritative catalog record;
//! identifiers the model invents or mistypes are discarded, and any parse or
//! transport failure degrades to the original retrieval order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::llm::LlmService;
use crate::models::coerce_numeric_id;
use crate::models::normalize_id;
use crate::models::RankedResult;
use crate::models::RerankDirective;
use crate::models::RerankEntry;
use crate::models::SearchCandidate;

/// Delay before the single retry of a failed LLM call
const RETRY_BACKOFF_MS: u64 = 500;

/// Minimal candidate projection sent to the LLM. Bounds prompt size and
/// avoids leaking fields the model has no business seeing.
#[derive(Debug, Serialize)]
struct CandidateSummary<'a> {
    id: i64,
    title: &'a str,
    similarity: Option<f64>,
    features: Option<&'a serde_json::Value>,
    details: &'a serde_json::Value,
    average_rating: Option<f32>,
    rating_number: Option<i32>,
    price: f64,
    reason: &'a str,
}

/// Re-ranks one partition's candidate set per request
pub struct Reranker {
    llm_service: Arc<LlmService>,
    temperature: f32,
    top_p: f32,
}

impl Reranker {
    /// Create a new reranker with bounded sampling parameters
    pub fn new(llm_service: Arc<LlmService>, temperature: f32, top_p: f32) -> Self {
        Self {
            llm_service,
            temperature,
            top_p,
        }
    }

    /// Reorder candidates by relevance to the query.
    ///
    /// Never fails: an LLM error, timeout, or malformed response yields the
    /// candidates back in retrieval order with no rerank metadata. A
    /// successfully parsed directive that matches nothing yields an empty
    /// list, which is a legitimate judgment, not a failure.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchCandidate>,
    ) -> Vec<RankedResult> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let prompt = build_rerank_prompt(query, &candidates);

        let raw = match self.invoke_with_retry(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("LLM rerank call failed, keeping retrieval order: {}", e);
                return fallback(candidates);
            }
        };

        match parse_directive(&raw) {
            Some(directive) => {
                debug!(
                    "Parsed rerank directive with {} entries",
                    directive.reranked_results.len()
                );
                let results = merge_directive(&directive.reranked_results, &candidates);
                info!(
                    "Reranked {} of {} candidates",
                    results.len(),
                    candidates.len()
                );
                results
            }
            None => {
                warn!(
                    "Failed to parse LLM rerank response, keeping retrieval order: {}",
                    raw.chars().take(200).collect::<String>()
                );
                fallback(candidates)
            }
        }
    }

    async fn invoke_with_retry(&self, prompt: &str) -> Result<String> {
        match self
            .llm_service
            .generate_with_params(prompt, self.temperature, self.top_p)
            .await
        {
            Ok(raw) => Ok(raw),
            Err(first) => {
                // One retry absorbs transient provider errors before falling back
                warn!("LLM call failed, retrying once: {}", first);
                tokio::time::sleep(std::time::Duration::from_millis(RETRY_BACKOFF_MS)).await;
                self.llm_service
                    .generate_with_params(prompt, self.temperature, self.top_p)
                    .await
            }
        }
    }
}

/// Build the re-ranking instruction for one partition's candidates
pub fn build_rerank_prompt(query: &str, candidates: &[SearchCandidate]) -> String {
    let summaries: Vec<CandidateSummary<'_>> = candidates
        .iter()
        .map(|c| CandidateSummary {
            id: c.product.id,
            title: &c.product.title,
            similarity: c.similarity,
            features: c.product.features.as_ref(),
            details: &c.product.details,
            average_rating: c.product.average_rating,
            rating_number: c.product.rating_number,
            price: c.product.price.unwrap_or(0.0),
            reason: "",
        })
        .collect();

    let candidate_json =
        serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"## USER QUERY
{query}

## CANDIDATE PRODUCTS
Top {count} relevant items:
{candidate_json}

## TASK
1. Re-rank the candidates in order of relevance to the user's query.
2. Prioritize products with high average rating and high rating number.
3. Rank 1 = most relevant. Use ties only if scores are identical.
4. IMPORTANT: You MUST use the EXACT product IDs from the input data. Do not generate new IDs.
5. Generate a reason for recommending this product to encourage the user to purchase it.

## OUTPUT FORMAT
(return **exactly** this JSON structure)
{{
  "reranked_results": [
    {{
      "id": "EXACT_ID_FROM_INPUT",
      "rank": 1,
      "rerank_score": 0.95,
      "reason": "Reason for recommending this product to encourage the user to purchase it."
    }}
  ],
  "query_understanding": "Summary of what the user is looking for"
}}

Rules:
- Do **not** add extra keys, comments, or trailing commas in the final JSON.
- You MUST use the EXACT product IDs from the input data. Do not generate new IDs.
- The system will verify that all IDs match the input data."#,
        query = query,
        count = candidates.len(),
        candidate_json = candidate_json,
    )
}

/// Decode the LLM response as a rerank directive. Tolerates a markdown code
/// fence around the JSON but nothing looser; anything unparseable is None.
pub fn parse_directive(raw: &str) -> Option<RerankDirective> {
    let trimmed = raw.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        // Fence may carry a language tag on the first line
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.trim().strip_suffix("```").map(str::trim)?
    } else {
        trimmed
    };

    serde_json::from_str(body).ok()
}

/// Reconcile directive entries against the retrieved candidate set.
///
/// Lookup is two-pass per entry: exact string match on the normalized id,
/// then numeric coercion of both sides. Entries that resolve to nothing are
/// logged and skipped; the survivors carry rank/rerank_score/reason onto the
/// full authoritative record and are sorted ascending by rank.
pub fn merge_directive(
    entries: &[RerankEntry],
    candidates: &[SearchCandidate],
) -> Vec<RankedResult> {
    let by_key: HashMap<String, &SearchCandidate> = candidates
        .iter()
        .map(|c| (c.product.id.to_string(), c))
        .collect();
    let by_numeric: HashMap<i64, &SearchCandidate> =
        candidates.iter().map(|c| (c.product.id, c)).collect();

    let mut results = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for entry in entries {
        let Some(key) = normalize_id(&entry.id) else {
            skipped += 1;
            warn!("Skipping rerank entry with unusable id: {:?}", entry.id);
            continue;
        };

        let candidate = by_key.get(key.as_str()).copied().or_else(|| {
            coerce_numeric_id(&key).and_then(|n| by_numeric.get(&n).copied())
        });

        match candidate {
            Some(candidate) => results.push(RankedResult::from_directive(candidate, entry)),
            None => {
                skipped += 1;
                warn!("Skipping rerank entry with unknown id: {}", key);
            }
        }
    }

    if skipped > 0 {
        info!("Discarded {} rerank entries with unresolvable ids", skipped);
    }

    // Model order is advisory; the rank field is the contract
    results.sort_by_key(|r| r.rank);
    results
}

/// Retrieval-ordered results with no rerank metadata
fn fallback(candidates: Vec<SearchCandidate>) -> Vec<RankedResult> {
    candidates.into_iter().map(RankedResult::unranked).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::ProductRecord;
    use crate::models::StockStatus;

    fn candidate(id: i64, title: &str, similarity: f64) -> SearchCandidate {
        SearchCandidate {
            product: ProductRecord {
                id,
                title: title.to_string(),
                average_rating: Some(4.2),
                rating_number: Some(37),
                features: Some(json!(["breathable"])),
                description: Some(format!("{title} description")),
                price: Some(29.99),
                images: None,
                store: Some("TestStore".to_string()),
                categories: Some("Shirts".to_string()),
                details: json!({"brand": "TestBrand"}),
            },
            similarity: Some(similarity),
            stock_status: StockStatus::InStock,
        }
    }

    fn entry(id: serde_json::Value, rank: i64, score: f64, reason: &str) -> RerankEntry {
        RerankEntry {
            id,
            rank,
            rerank_score: Some(score),
            reason: Some(reason.to_string()),
        }
    }

    #[test]
    fn test_unknown_ids_never_appear_in_output() {
        let candidates = vec![candidate(1, "Red Shirt", 0.9)];
        let entries = vec![
            entry(json!("999"), 1, 0.9, "hallucinated"),
            entry(json!(1), 2, 0.8, "real"),
        ];
        let results = merge_directive(&entries, &candidates);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].product.id, 1);
    }

    #[test]
    fn test_merge_preserves_authoritative_fields() {
        let candidates = vec![candidate(5, "Linen Dress", 0.77)];
        let entries = vec![entry(json!("5"), 1, 0.95, "great fit")];
        let results = merge_directive(&entries, &candidates);
        assert_eq!(results.len(), 1);
        // Everything but the overlay equals the retrieved record
        assert_eq!(results[0].product, candidates[0].product);
        assert_eq!(results[0].similarity, Some(0.77));
        assert_eq!(results[0].rank, Some(1));
        assert_eq!(results[0].rerank_score, Some(0.95));
        assert_eq!(results[0].reason.as_deref(), Some("great fit"));
    }

    #[test]
    fn test_string_and_integer_ids_both_resolve() {
        let candidates = vec![candidate(42, "Wool Coat", 0.8)];
        for id in [json!("42"), json!(42), json!(" 42 "), json!("042")] {
            let results = merge_directive(&[entry(id, 1, 0.9, "match")], &candidates);
            assert_eq!(results.len(), 1, "id variant should resolve");
            assert_eq!(results[0].product.id, 42);
        }
    }

    #[test]
    fn test_out_of_order_ranks_are_sorted_ascending() {
        let candidates = vec![
            candidate(1, "A", 0.9),
            candidate(2, "B", 0.8),
            candidate(3, "C", 0.7),
        ];
        let entries = vec![
            entry(json!(3), 3, 0.5, "c"),
            entry(json!(1), 1, 0.9, "a"),
            entry(json!(2), 2, 0.7, "b"),
        ];
        let results = merge_directive(&entries, &candidates);
        let ranks: Vec<_> = results.iter().map(|r| r.rank.unwrap()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(results[0].product.id, 1);
    }

    #[test]
    fn test_duplicate_ranks_keep_model_order() {
        let candidates = vec![candidate(1, "A", 0.9), candidate(2, "B", 0.8)];
        let entries = vec![
            entry(json!(2), 1, 0.9, "tie-b"),
            entry(json!(1), 1, 0.9, "tie-a"),
        ];
        let results = merge_directive(&entries, &candidates);
        // Stable sort: ties stay in the order the model emitted them
        assert_eq!(results[0].product.id, 2);
        assert_eq!(results[1].product.id, 1);
    }

    #[test]
    fn test_parse_directive_plain_json() {
        let raw = r#"{"reranked_results": [{"id": "1", "rank": 1, "rerank_score": 0.9, "reason": "ok"}], "query_understanding": "shirts"}"#;
        let directive = parse_directive(raw).unwrap();
        assert_eq!(directive.reranked_results.len(), 1);
        assert_eq!(directive.query_understanding.as_deref(), Some("shirts"));
    }

    #[test]
    fn test_parse_directive_fenced_json() {
        let raw = "```json\n{\"reranked_results\": [{\"id\": 1, \"rank\": 1}]}\n```";
        let directive = parse_directive(raw).unwrap();
        assert_eq!(directive.reranked_results.len(), 1);
    }

    #[test]
    fn test_parse_directive_rejects_garbage() {
        assert!(parse_directive("Sorry, I cannot rank these products.").is_none());
        assert!(parse_directive("{\"reranked_results\": ").is_none());
        assert!(parse_directive("").is_none());
    }

    #[test]
    fn test_empty_directive_is_empty_output_not_fallback() {
        let raw = r#"{"reranked_results": []}"#;
        let directive = parse_directive(raw).unwrap();
        let candidates = vec![candidate(1, "A", 0.9)];
        let results = merge_directive(&directive.reranked_results, &candidates);
        assert!(results.is_empty());
    }

    #[test]
    fn test_fallback_preserves_order_and_defaults() {
        let candidates = vec![candidate(1, "A", 0.9), candidate(2, "B", 0.8)];
        let results = fallback(candidates.clone());
        assert_eq!(results.len(), 2);
        for (result, original) in results.iter().zip(&candidates) {
            assert_eq!(result.product, original.product);
            assert_eq!(result.similarity, original.similarity);
            assert_eq!(result.rank, None);
            assert_eq!(result.rerank_score, None);
            assert_eq!(result.reason, None);
        }
    }

    #[test]
    fn test_prompt_contains_query_and_ids() {
        let candidates = vec![candidate(7, "Silk Scarf", 0.88)];
        let prompt = build_rerank_prompt("red scarf for winter", &candidates);
        assert!(prompt.contains("red scarf for winter"));
        assert!(prompt.contains("\"id\": 7"));
        assert!(prompt.contains("reranked_results"));
        // The full record stays out of the prompt
        assert!(!prompt.contains("Silk Scarf description"));
    }

    #[test]
    fn test_end_to_end_two_shirt_scenario() {
        let candidates = vec![candidate(1, "Red Shirt", 0.9), candidate(2, "Blue Shirt", 0.8)];
        let raw = r#"{
            "reranked_results": [
                {"id": "2", "rank": 1, "rerank_score": 0.95, "reason": "color match"},
                {"id": "1", "rank": 2, "rerank_score": 0.80, "reason": "ok"}
            ]
        }"#;
        let directive = parse_directive(raw).unwrap();
        let results = merge_directive(&directive.reranked_results, &candidates);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].product.id, 2);
        assert_eq!(results[0].product.title, "Blue Shirt");
        assert_eq!(results[0].similarity, Some(0.8));
        assert_eq!(results[0].rank, Some(1));
        assert_eq!(results[0].reason.as_deref(), Some("color match"));
        assert_eq!(results[1].product.id, 1);
        assert_eq!(results[1].product.title, "Red Shirt");
        assert_eq!(results[1].similarity, Some(0.9));
        assert_eq!(results[1].rank, Some(2));
    }
}
