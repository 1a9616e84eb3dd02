//! Fallback recommendation extraction from raw decision text.

use std::sync::LazyLock;

use regex::Regex;

/// Label used when no BUY/SELL/HOLD signal can be found.
pub const UNKNOWN_RECOMMENDATION: &str = "UNKNOWN";

static SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(buy|sell|hold)\b").expect("signal regex is valid")
});

/// Derive a BUY/SELL/HOLD label from a pipeline's raw decision.
///
/// Decisions usually end with a "FINAL TRANSACTION PROPOSAL" line, so the
/// last signal word wins.
pub fn extract_recommendation(raw_decision: &str) -> String {
    SIGNAL
        .find_iter(raw_decision)
        .last()
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| UNKNOWN_RECOMMENDATION.to_string())
}
