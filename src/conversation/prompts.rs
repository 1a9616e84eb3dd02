//! User-facing text: greeting, re-prompts, and the final reply templates.

use crate::error::{DispatchError, ParseError};

use super::slot::Slot;

/// Reply to any input once the conversation is over.
pub const TERMINATED_MESSAGE: &str =
    "❌ All steps completed. Please restart the conversation to run another analysis.";

const GREETING: &str = "👋 Welcome to the multi-agent trading analyst. \
Answer step-by-step to receive a complete investment analysis.";

/// Greeting plus the first slot's question, shown when a session starts.
pub fn opening_prompt() -> String {
    format!("{GREETING}\n\n{}", Slot::ALL[0].prompt())
}

/// Rejection notice followed by the same slot's question again.
pub fn reprompt(slot: Slot, error: &ParseError) -> String {
    format!("⚠️ {error}\n\n{}", slot.prompt())
}

/// Reply for a successful analysis.
pub fn success_message(ticker: &str, raw_decision: &str, recommendation: &str) -> String {
    format!(
        "✅ Final Trading Decision for {ticker}:\n\n{raw_decision}\n\n📌 Recommendation: {recommendation}"
    )
}

/// Reply for a failed analysis.
pub fn error_message(error: &DispatchError) -> String {
    format!("❌ Error during analysis: {error}")
}
