//! Conversation state: which slot is next and what has been collected.

use serde::{Deserialize, Serialize};

use super::slot::{Answer, Slot};

/// Where a conversation currently is.
///
/// Progresses linearly: Step(ticker) → … → Step(deep_model) → Dispatching →
/// Terminated. Only a reset leaves Terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Step(Slot),
    Dispatching,
    Terminated,
}

impl Phase {
    /// Whether this phase is terminal (no further input is accepted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(slot) => write!(f, "{slot}"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Parsed answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    pub ticker: Option<String>,
    pub analysis_date: Option<String>,
    pub analysts: Option<Vec<String>>,
    pub research_depth: Option<i64>,
    pub quick_model: Option<String>,
    pub deep_model: Option<String>,
}

impl Selections {
    /// Store an answer for `slot`.
    ///
    /// Answers whose shape does not fit the slot are dropped with a warning;
    /// [`Slot::parse`] never produces them.
    pub fn record(&mut self, slot: Slot, answer: Answer) {
        match (slot, answer) {
            (Slot::Ticker, Answer::Text(v)) => self.ticker = Some(v),
            (Slot::AnalysisDate, Answer::Text(v)) => self.analysis_date = Some(v),
            (Slot::Analysts, Answer::List(v)) => self.analysts = Some(v),
            (Slot::ResearchDepth, Answer::Integer(v)) => self.research_depth = Some(v),
            (Slot::QuickModel, Answer::Text(v)) => self.quick_model = Some(v),
            (Slot::DeepModel, Answer::Text(v)) => self.deep_model = Some(v),
            (slot, answer) => {
                tracing::warn!(%slot, ?answer, "Answer shape does not match slot, ignoring");
            }
        }
    }

    /// All values, once every slot is filled. Returns the first missing slot otherwise.
    pub fn complete(&self) -> Result<CompletedSelections, Slot> {
        Ok(CompletedSelections {
            ticker: self.ticker.clone().ok_or(Slot::Ticker)?,
            analysis_date: self.analysis_date.clone().ok_or(Slot::AnalysisDate)?,
            analysts: self.analysts.clone().ok_or(Slot::Analysts)?,
            research_depth: self.research_depth.ok_or(Slot::ResearchDepth)?,
            quick_model: self.quick_model.clone().ok_or(Slot::QuickModel)?,
            deep_model: self.deep_model.clone().ok_or(Slot::DeepModel)?,
        })
    }
}

/// Every slot's value, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSelections {
    pub ticker: String,
    pub analysis_date: String,
    pub analysts: Vec<String>,
    pub research_depth: i64,
    pub quick_model: String,
    pub deep_model: String,
}

/// Per-conversation state, owned by whoever hosts the session and mutated
/// only by the collector.
///
/// `current_index` stays within `0..=Slot::COUNT + 1`: `Slot::COUNT` means
/// dispatch is pending, anything past it means the conversation is over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    current_index: usize,
    selections: Selections,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next slot to fill.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Current phase derived from the index.
    pub fn phase(&self) -> Phase {
        match Slot::at(self.current_index) {
            Some(slot) => Phase::Step(slot),
            None if self.current_index == Slot::COUNT => Phase::Dispatching,
            None => Phase::Terminated,
        }
    }

    /// Slot awaiting an answer, if any.
    pub fn current_slot(&self) -> Option<Slot> {
        Slot::at(self.current_index)
    }

    pub fn is_terminated(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Discard everything and start over at the first slot.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Store the answer for the current slot and move to the next one.
    pub(crate) fn accept(&mut self, answer: Answer) {
        if let Some(slot) = self.current_slot() {
            self.selections.record(slot, answer);
            self.current_index += 1;
        }
    }

    /// Move past dispatch. Further input is rejected until reset.
    pub(crate) fn terminate(&mut self) {
        self.current_index = Slot::COUNT + 1;
    }
}
