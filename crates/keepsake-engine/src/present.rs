//! Output shaping: the three response views derived from one wake result.
//!
//! All three views are projections of the same `RetrievalResult`; none of
//! them re-queries the store. `full` is the result as-is, `context` is a
//! stripped union sized for a language-model prompt, `digest` is the
//! human-facing narrative.

use chrono::{DateTime, Datelike, Utc};
use keepsake_types::config::{DAY_NAMES, MONTH_NAMES};
use keepsake_types::observation::{ObservationId, ObservationKind};
use keepsake_types::retrieval::{RetrievalResult, ScoredObservation};
use serde::{Deserialize, Serialize};

/// Which response view the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Per-tier records with scores, diagnostics, and provenance.
    #[default]
    Full,
    /// Deduplicated, field-stripped union for prompt assembly.
    Context,
    /// Narrative summary for humans.
    Digest,
}

impl Shape {
    /// Parse a shape name, case-insensitively. Unknown names read as full.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "context" => Shape::Context,
            "digest" => Shape::Digest,
            _ => Shape::Full,
        }
    }
}

/// Maximum characters kept in digest previews.
const PREVIEW_CHARS: usize = 80;

/// One stripped record in the context view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Record id.
    pub id: ObservationId,
    /// Category tag.
    pub kind: ObservationKind,
    /// Free-text body, verbatim.
    pub content: String,
    /// Salience after decay.
    pub decayed_salience: i64,
    /// Whether the record is pinned.
    pub pinned: bool,
}

/// Share of each emotion channel across the whole view, integer percent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EmotionBreakdown {
    pub intimacy: i64,
    pub conflict: i64,
    pub joy: i64,
    pub fear: i64,
}

/// The deduplicated view sized for downstream prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextView {
    /// Union of all three tiers, first appearance wins.
    pub records: Vec<ContextRecord>,
    /// Aggregate emotional texture of the included records.
    pub emotions: EmotionBreakdown,
    /// Rough size of the rendered content, in tokens.
    pub estimated_tokens: usize,
    /// When the underlying wake ran.
    pub generated_at: DateTime<Utc>,
}

/// One anniversary hit in the digest view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anniversary {
    /// Record id.
    pub id: ObservationId,
    /// Whole years since the record was created.
    pub years_ago: i32,
    /// Truncated content.
    pub preview: String,
}

/// The human-facing narrative view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestView {
    /// "Friday, June 3" style date line.
    pub header: String,
    /// One line per non-empty tier.
    pub summaries: Vec<String>,
    /// Identity-kind records, truncated.
    pub identity_previews: Vec<String>,
    /// Records created on this month and day in an earlier year.
    pub anniversaries: Vec<Anniversary>,
    /// When the underlying wake ran.
    pub generated_at: DateTime<Utc>,
}

/// Union of the three tiers, deduplicated by id, first appearance kept.
fn tier_union(result: &RetrievalResult) -> Vec<&ScoredObservation> {
    let mut seen = std::collections::HashSet::new();
    result
        .recent
        .iter()
        .chain(&result.salient)
        .chain(&result.hot)
        .filter(|scored| seen.insert(scored.observation.id.as_str()))
        .collect()
}

/// Build the context view from a finished wake result.
pub fn context_view(result: &RetrievalResult) -> ContextView {
    let union = tier_union(result);

    let mut totals = (0i64, 0i64, 0i64, 0i64);
    let mut content_bytes = 0usize;
    let records: Vec<ContextRecord> = union
        .iter()
        .map(|scored| {
            let obs = &scored.observation;
            totals.0 += obs.emotions.intimacy;
            totals.1 += obs.emotions.conflict;
            totals.2 += obs.emotions.joy;
            totals.3 += obs.emotions.fear;
            content_bytes += obs.content.len();
            ContextRecord {
                id: obs.id.clone(),
                kind: obs.kind.clone(),
                content: obs.content.clone(),
                decayed_salience: scored.decayed_salience,
                pinned: obs.pinned,
            }
        })
        .collect();

    let grand_total = totals.0 + totals.1 + totals.2 + totals.3;
    let pct = |part: i64| {
        if grand_total == 0 {
            0
        } else {
            part * 100 / grand_total
        }
    };

    ContextView {
        records,
        emotions: EmotionBreakdown {
            intimacy: pct(totals.0),
            conflict: pct(totals.1),
            joy: pct(totals.2),
            fear: pct(totals.3),
        },
        // roughly four bytes per token for English prose
        estimated_tokens: content_bytes.div_ceil(4),
        generated_at: result.generated_at,
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

/// Build the digest view from a finished wake result.
pub fn digest_view(result: &RetrievalResult) -> DigestView {
    let now = result.generated_at;
    let day_name = DAY_NAMES[now.weekday().num_days_from_monday() as usize];
    let month_name = MONTH_NAMES[now.month0() as usize];
    let header = format!("{day_name}, {month_name} {}", now.day());

    let mut summaries = Vec::new();
    if let Some(newest) = result.recent.first() {
        summaries.push(format!(
            "{} recent observation(s), newest: {}",
            result.recent.len(),
            preview(&newest.observation.content)
        ));
    }
    if let Some(top) = result.salient.first() {
        summaries.push(format!(
            "{} salient observation(s), strongest at {}: {}",
            result.salient.len(),
            top.decayed_salience,
            preview(&top.observation.content)
        ));
    }
    if let Some(warmest) = result.hot.first() {
        summaries.push(format!(
            "{} emotionally charged observation(s), warmest: {}",
            result.hot.len(),
            preview(&warmest.observation.content)
        ));
    }

    let union = tier_union(result);
    let identity_previews = union
        .iter()
        .filter(|scored| scored.observation.kind == ObservationKind::Identity)
        .map(|scored| preview(&scored.observation.content))
        .collect();

    let anniversaries = union
        .iter()
        .filter(|scored| {
            let created = scored.observation.created_at;
            created.month() == now.month() && created.day() == now.day() && created.year() < now.year()
        })
        .map(|scored| Anniversary {
            id: scored.observation.id.clone(),
            years_ago: now.year() - scored.observation.created_at.year(),
            preview: preview(&scored.observation.content),
        })
        .collect();

    DigestView {
        header,
        summaries,
        identity_previews,
        anniversaries,
        generated_at: now,
    }
}
