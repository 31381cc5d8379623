//! Inbound query validation
//!
//! Rejects queries before any embedding or database work happens. Failures
//! here are client errors with field-specific messages.

use crate::errors::Result;
use crate::errors::StyleRankError;

/// Default result count per partition
pub const DEFAULT_TOP_K: i64 = 10;

/// Request-level bound for top_k (the store layer has its own wider clamp)
pub const MAX_TOP_K: i64 = 10;

const MAX_QUERY_LENGTH: usize = 100;

/// Terms that disqualify a query outright
const BLOCKED_TERMS: &[&str] = &[
    "gun", "bomb", "kill", "murder", "shoot", "attack", "weapon", "explosive",
    "bullet", "acid", "sniper", "grenade", "terror", "assault", "execute",
    "behead", "poison", "cyanide", "sarin", "anthrax", "suicide bomber",
    "arson", "sabotage", "molotov", "lynch", "genocide", "riot", "vandalism",
    "rape", "slaughter", "firearm", "extremist", "burn down", "hate crime",
    "abuse", "threaten",
];

/// Characters that suggest markup or injection attempts
const INVALID_CHARS: &[char] = &['<', '>', '{', '}', '[', ']', '\\'];

/// Validate a free-text search query
pub fn validate_query(query: &str) -> Result<()> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(StyleRankError::Validation(
            "Query cannot be empty or only spaces.".to_string(),
        ));
    }

    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(StyleRankError::Validation(format!(
            "Query cannot be longer than {MAX_QUERY_LENGTH} characters."
        )));
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(StyleRankError::Validation(
            "Query cannot contain only numbers.".to_string(),
        ));
    }

    if !query.chars().any(char::is_alphanumeric) {
        return Err(StyleRankError::Validation(
            "Query cannot contain only symbols.".to_string(),
        ));
    }

    let lowered = query.to_lowercase();
    if BLOCKED_TERMS.iter().any(|term| lowered.contains(term)) {
        return Err(StyleRankError::Validation(
            "Query contains inappropriate words.".to_string(),
        ));
    }

    if query.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(StyleRankError::Validation(
            "Query contains invalid characters.".to_string(),
        ));
    }

    Ok(())
}

/// Validate an optional top_k, applying the default when absent
pub fn validate_top_k(top_k: Option<i64>) -> Result<i64> {
    match top_k {
        None => Ok(DEFAULT_TOP_K),
        Some(v) if (1..=MAX_TOP_K).contains(&v) => Ok(v),
        Some(_) => Err(StyleRankError::Validation(format!(
            "Top k must be between 1 and {MAX_TOP_K}."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_normal_query() {
        assert!(validate_query("summer beach outfit").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
    }

    #[test]
    fn test_rejects_overlong_query() {
        let long = "a".repeat(101);
        assert!(validate_query(&long).is_err());
        let ok = "a".repeat(100);
        assert!(validate_query(&ok).is_ok());
    }

    #[test]
    fn test_rejects_digits_only() {
        assert!(validate_query("123456").is_err());
        assert!(validate_query(" 42 ").is_err());
        // Digits mixed with words are fine
        assert!(validate_query("size 42 shoes").is_ok());
    }

    #[test]
    fn test_rejects_symbols_only() {
        assert!(validate_query("!!! ???").is_err());
    }

    #[test]
    fn test_rejects_blocked_terms() {
        let err = validate_query("shirt with gun print").unwrap_err();
        assert!(format!("{err}").contains("inappropriate"));
    }

    #[test]
    fn test_rejects_markup_characters() {
        assert!(validate_query("<script>red dress").is_err());
        assert!(validate_query("dress {large}").is_err());
        assert!(validate_query("dress [large]").is_err());
    }

    #[test]
    fn test_top_k_bounds() {
        assert_eq!(validate_top_k(None).unwrap(), DEFAULT_TOP_K);
        assert_eq!(validate_top_k(Some(1)).unwrap(), 1);
        assert_eq!(validate_top_k(Some(10)).unwrap(), 10);
        assert!(validate_top_k(Some(0)).is_err());
        assert!(validate_top_k(Some(11)).is_err());
        assert!(validate_top_k(Some(-3)).is_err());
    }
}
