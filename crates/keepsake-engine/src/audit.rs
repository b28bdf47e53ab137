//! Post-hoc validation and provenance tagging for wake results.
//!
//! Invariant checks run after tiering and report violations as string
//! codes on the result; they never abort the request. A violation here
//! means a bug upstream (or a corrupted store), and the caller deserves
//! the records plus the diagnosis rather than an error page.

use keepsake_types::config::WakeTuning;
use keepsake_types::lens::Lens;
use keepsake_types::observation::{Observation, ObservationId, ObservationKind, ObservationStatus};
use keepsake_types::retrieval::{tags, violations, ScoredObservation};
use std::collections::{HashMap, HashSet};

/// Scan the loaded set and the finished tiers for invariant violations.
pub fn check_invariants(
    loaded: &[Observation],
    recent: &[ScoredObservation],
    salient: &[ScoredObservation],
    hot: &[ScoredObservation],
    limit: usize,
    tuning: &WakeTuning,
) -> Vec<String> {
    let mut found = Vec::new();

    if loaded.iter().any(|obs| obs.deleted_at.is_some()) {
        found.push(violations::DELETED_RECORD_LOADED.to_string());
    }
    if loaded
        .iter()
        .any(|obs| obs.status == ObservationStatus::Superseded)
    {
        found.push(violations::SUPERSEDED_RECORD_LOADED.to_string());
    }
    if hot
        .iter()
        .any(|scored| !scored.hot_score.unwrap_or(f64::NAN).is_finite())
    {
        found.push(violations::NONFINITE_HOT_SCORE.to_string());
    }
    for (name, tier, cap) in [
        ("recent", recent, limit),
        ("salient", salient, limit),
        ("hot", hot, tuning.max_tier_limit),
    ] {
        if tier.len() > cap {
            found.push(violations::tier_overflow(name));
        }
    }
    if loaded.len() > tuning.loaded_ceiling {
        found.push(violations::LOADED_CEILING_EXCEEDED.to_string());
    }

    if !found.is_empty() {
        tracing::warn!(violations = ?found, "wake result violated invariants");
    }
    found
}

/// Everything provenance tagging needs to know about how a wake unfolded.
pub struct ProvenanceContext<'a> {
    /// Ids returned by the critical query.
    pub critical_ids: &'a HashSet<ObservationId>,
    /// The finished recent tier.
    pub recent: &'a [ScoredObservation],
    /// The finished salient tier.
    pub salient: &'a [ScoredObservation],
    /// The finished hot tier.
    pub hot: &'a [ScoredObservation],
    /// Lenses applied during filtering.
    pub lenses: &'a [Lens],
}

fn tier_ids(tier: &[ScoredObservation]) -> HashSet<&str> {
    tier.iter()
        .map(|scored| scored.observation.id.as_str())
        .collect()
}

/// Tag every loaded record with why it was loaded, strongest reason first.
pub fn tag_provenance(
    loaded: &[Observation],
    ctx: &ProvenanceContext<'_>,
    tuning: &WakeTuning,
) -> HashMap<ObservationId, Vec<String>> {
    let recent_ids = tier_ids(ctx.recent);
    let salient_ids = tier_ids(ctx.salient);
    let hot_ids = tier_ids(ctx.hot);
    let negated: Vec<&Lens> = ctx.lenses.iter().filter(|lens| lens.negated).collect();

    let mut provenance = HashMap::with_capacity(loaded.len());
    for obs in loaded {
        let mut record_tags: Vec<String> = Vec::new();
        let mut critically_salient = false;

        if ctx.critical_ids.contains(&obs.id) {
            if obs.kind == ObservationKind::Correction {
                record_tags.push(tags::CORRECTION_KIND.to_string());
            }
            if obs.salience >= tuning.critical_salience {
                record_tags.push(tags::SALIENCE_CRITICAL.to_string());
                critically_salient = true;
            }
        }
        if hot_ids.contains(obs.id.as_str()) {
            record_tags.push(tags::HOT_SCORE.to_string());
        }
        if salient_ids.contains(obs.id.as_str()) && !critically_salient {
            record_tags.push(tags::SALIENCE_RANK.to_string());
        }
        if recent_ids.contains(obs.id.as_str()) {
            record_tags.push(tags::RECENCY.to_string());
        }
        for lens in ctx.lenses.iter().filter(|lens| !lens.negated) {
            if lens.satisfied_by(obs, tuning) {
                record_tags.push(tags::lens(&lens.label()));
            }
        }
        let survived: Vec<&str> = negated
            .iter()
            .filter(|lens| lens.passes(obs, tuning))
            .map(|lens| lens.kind.as_str())
            .collect();
        if !survived.is_empty() {
            record_tags.push(tags::negated_lens_pass(&survived.join("+")));
        }
        if record_tags.is_empty() {
            record_tags.push(tags::MERGED_DEDUP.to_string());
        }
        provenance.insert(obs.id.clone(), record_tags);
    }
    provenance
}
