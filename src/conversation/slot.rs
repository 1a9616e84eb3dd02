//! Slots: the ordered parameters a conversation collects before dispatch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One named parameter the conversation must collect.
///
/// Slots are always asked in the order of [`Slot::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Ticker,
    AnalysisDate,
    Analysts,
    ResearchDepth,
    QuickModel,
    DeepModel,
}

impl Slot {
    /// Every slot, in the order they are asked.
    pub const ALL: [Slot; 6] = [
        Slot::Ticker,
        Slot::AnalysisDate,
        Slot::Analysts,
        Slot::ResearchDepth,
        Slot::QuickModel,
        Slot::DeepModel,
    ];

    /// Number of slots to fill before dispatch.
    pub const COUNT: usize = Self::ALL.len();

    /// Slot at `index` in asking order, if any.
    pub fn at(index: usize) -> Option<Slot> {
        Self::ALL.get(index).copied()
    }

    /// Identifier used as the key in selections and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::AnalysisDate => "analysis_date",
            Self::Analysts => "analysts",
            Self::ResearchDepth => "research_depth",
            Self::QuickModel => "quick_model",
            Self::DeepModel => "deep_model",
        }
    }

    /// Question shown to the user when this slot is next.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Ticker => "📈 What stock or token would you like to analyze? (e.g., TSLA, BTC, ETH)",
            Self::AnalysisDate => "📅 What is the analysis date? (YYYY-MM-DD, or type 'today')",
            Self::Analysts => {
                "👥 Which agents do you want to include? (Choose any of: market, social, news, fundamentals)"
            }
            Self::ResearchDepth => "🔍 Select research depth (1 = shallow, 2 = moderate, 3 = deep)",
            Self::QuickModel => "🤖 Choose model for quick-thinking agents (e.g., gpt-4o-mini)",
            Self::DeepModel => "🧠 Choose model for deep-thinking agents (e.g., o4-mini)",
        }
    }

    /// Parse and normalize a raw answer for this slot.
    ///
    /// `today` is substituted when the analysis date is given as "today".
    /// Only `ResearchDepth` can reject input; every other slot accepts any
    /// string and leaves validation to the pipeline.
    pub fn parse(&self, raw: &str, today: NaiveDate) -> Result<Answer, ParseError> {
        let trimmed = raw.trim();
        match self {
            Self::Ticker => Ok(Answer::Text(trimmed.to_uppercase())),
            Self::AnalysisDate => {
                if trimmed.eq_ignore_ascii_case("today") {
                    Ok(Answer::Text(today.format("%Y-%m-%d").to_string()))
                } else {
                    Ok(Answer::Text(trimmed.to_string()))
                }
            }
            Self::Analysts => Ok(Answer::List(
                raw.split(',')
                    .map(|a| a.trim().to_lowercase())
                    .collect(),
            )),
            Self::ResearchDepth => trimmed
                .parse::<i64>()
                .map(Answer::Integer)
                .map_err(|_| ParseError::InvalidInteger {
                    input: trimmed.to_string(),
                }),
            Self::QuickModel | Self::DeepModel => Ok(Answer::Text(trimmed.to_string())),
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed, normalized answer for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    List(Vec<String>),
    Integer(i64),
}
