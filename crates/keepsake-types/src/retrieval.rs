//! Request and result types for the wake retrieval pipeline.

use crate::observation::{AgentId, Observation, ObservationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provenance tag vocabulary: why a record was loaded or kept.
///
/// Tags are attached in this priority order, strongest reason first.
pub mod tags {
    /// The record is a correction; corrections always surface.
    pub const CORRECTION_KIND: &str = "correction_kind";
    /// Raw salience at or above the critical threshold.
    pub const SALIENCE_CRITICAL: &str = "salience_critical";
    /// Selected into the hot tier by emotional charge.
    pub const HOT_SCORE: &str = "hot_score";
    /// Selected into the salient tier by decayed salience.
    pub const SALIENCE_RANK: &str = "salience_rank";
    /// Selected into the recent tier by creation time.
    pub const RECENCY: &str = "recency";
    /// Loaded by more than one tier query and merged during dedup.
    pub const MERGED_DEDUP: &str = "merged_dedup";

    /// Tag for passing a positive lens.
    pub fn lens(label: &str) -> String {
        format!("lens:{label}")
    }

    /// Tag for surviving one or more negated lenses.
    pub fn negated_lens_pass(kinds: &str) -> String {
        format!("negated_lens_pass:{kinds}")
    }
}

/// Invariant violation codes reported in wake diagnostics.
///
/// Violations never abort a wake; they ride along in the result.
pub mod violations {
    /// A soft-deleted record reached the pipeline.
    pub const DELETED_RECORD_LOADED: &str = "deleted_record_loaded";
    /// A superseded record reached the pipeline.
    pub const SUPERSEDED_RECORD_LOADED: &str = "superseded_record_loaded";
    /// A hot score came out NaN or infinite.
    pub const NONFINITE_HOT_SCORE: &str = "nonfinite_hot_score";
    /// The total distinct records loaded exceeded the configured ceiling.
    pub const LOADED_CEILING_EXCEEDED: &str = "loaded_ceiling_exceeded";

    /// Code for a tier holding more records than the clamped limit.
    pub fn tier_overflow(tier: &str) -> String {
        format!("tier_overflow:{tier}")
    }
}

/// Parameters of one wake call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeRequest {
    /// Which agent is waking.
    pub agent_id: AgentId,
    /// Requested per-tier limit; clamped into `1..=max_tier_limit`.
    pub limit: Option<usize>,
    /// Whether to build the hot tier.
    pub hot: bool,
    /// Whether to attach provenance tags to the result.
    pub explain: bool,
    /// Raw lens expression, parsed leniently.
    pub lens: Option<String>,
}

impl WakeRequest {
    /// A wake with default knobs: full limit, hot tier on, no explain, no lens.
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            limit: None,
            hot: true,
            explain: false,
            lens: None,
        }
    }
}

/// An observation annotated with the scores retrieval computed for it.
///
/// Scores are derived per wake and never written back to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredObservation {
    /// The underlying record, fields inlined.
    #[serde(flatten)]
    pub observation: Observation,
    /// Salience after time decay, floored at zero.
    pub decayed_salience: i64,
    /// Emotional-charge score; only computed when the hot tier is on.
    pub hot_score: Option<f64>,
}

/// The full product of one wake call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Which agent woke.
    pub agent_id: AgentId,
    /// Newest active records, newest first.
    pub recent: Vec<ScoredObservation>,
    /// Highest decayed salience, with near-ties broken by recency.
    pub salient: Vec<ScoredObservation>,
    /// Most emotionally charged, by hot score. Empty when hot is off.
    pub hot: Vec<ScoredObservation>,
    /// Distinct records loaded across all tier queries, before filtering.
    pub loaded: usize,
    /// Invariant violation codes observed while assembling this result.
    pub violations: Vec<String>,
    /// Per-record provenance tags, present when explain was requested.
    pub provenance: Option<HashMap<ObservationId, Vec<String>>>,
    /// When this result was assembled.
    pub generated_at: DateTime<Utc>,
}

impl RetrievalResult {
    /// Total records across the three tiers, counting duplicates once per tier.
    pub fn total(&self) -> usize {
        self.recent.len() + self.salient.len() + self.hot.len()
    }

    /// True when no tier surfaced anything.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
