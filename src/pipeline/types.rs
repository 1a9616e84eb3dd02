//! Shared types for dispatching to the analysis pipeline.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DispatchError};

// ── Analysis config ─────────────────────────────────────────────────

/// Configuration handed to the analysis pipeline.
///
/// Only the round counts and the two model names are written by the
/// collector. Everything else comes from the base config and is passed
/// through untouched, including keys this crate does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub llm_provider: String,
    pub backend_url: String,
    #[serde(rename = "deep_think_llm")]
    pub deep_think_model: String,
    #[serde(rename = "quick_think_llm")]
    pub quick_think_model: String,
    pub max_debate_rounds: i64,
    pub max_risk_discuss_rounds: i64,
    pub max_recur_limit: i64,
    pub online_tools: bool,
    /// Unrecognized keys from the base config.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            llm_provider: "openai".to_string(),
            backend_url: "https://api.openai.com/v1".to_string(),
            deep_think_model: "o4-mini".to_string(),
            quick_think_model: "gpt-4o-mini".to_string(),
            max_debate_rounds: 1,
            max_risk_discuss_rounds: 1,
            max_recur_limit: 100,
            online_tools: true,
            extra: serde_json::Map::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load a base config from a JSON file.
    ///
    /// Missing known keys fall back to [`AnalysisConfig::default`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a base config from JSON text, filling missing keys from defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let overrides: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ConfigError::ParseError(
                "base config must be a JSON object".to_string(),
            ));
        };

        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) | Err(_) => serde_json::Map::new(),
        };
        merged.extend(overrides);

        serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Copy of this config with the user's depth and model choices applied.
    pub fn with_selections(&self, research_depth: i64, quick_model: &str, deep_model: &str) -> Self {
        Self {
            max_debate_rounds: research_depth,
            max_risk_discuss_rounds: research_depth,
            quick_think_model: quick_model.to_string(),
            deep_think_model: deep_model.to_string(),
            ..self.clone()
        }
    }
}

// ── Dispatch request / result ───────────────────────────────────────

/// Everything the pipeline needs for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub analysts: Vec<String>,
    pub config: AnalysisConfig,
    pub ticker: String,
    pub analysis_date: String,
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Full decision text produced by the pipeline.
    pub raw_decision: String,
    /// Short label such as BUY, SELL or HOLD. May be empty, in which case
    /// the collector derives one from `raw_decision`.
    #[serde(default)]
    pub recommendation: String,
}

// ── Runner trait ────────────────────────────────────────────────────

/// Runs the external analysis pipeline. Treated strictly as a black box.
///
/// Implementations should be cancel-safe: the collector drops the future
/// when the dispatch timeout elapses.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    /// Runner name for logs and error messages (e.g. "command", "http").
    fn name(&self) -> &str;

    /// Run one analysis.
    async fn run(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError>;
}
