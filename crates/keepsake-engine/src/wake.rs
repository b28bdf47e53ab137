//! The wake pipeline: tiered query, merge, filter, rank, audit, reinforce.
//!
//! One wake is one stateless unit of work. The three tier queries, the
//! per-record reinforcement loop, and everything in between run as
//! independent statements against the store; a failure partway leaves
//! earlier writes committed and aborts the rest.

use crate::audit::{check_invariants, tag_provenance, ProvenanceContext};
use crate::order::{canonical_order, rank_by, Direction};
use crate::scoring::{decayed_salience, hot_score};
use chrono::{DateTime, Utc};
use keepsake_types::config::WakeTuning;
use keepsake_types::error::KeepsakeResult;
use keepsake_types::lens::{parse_lenses, passes_all, Lens};
use keepsake_types::observation::{AgentId, Observation, ObservationId};
use keepsake_types::retrieval::{RetrievalResult, ScoredObservation, WakeRequest};
use keepsake_types::store::RecordStore;
use std::collections::{HashMap, HashSet};

/// Run one wake: assemble the three tiers for an agent and reinforce
/// every record that surfaced.
pub fn wake(
    store: &dyn RecordStore,
    tuning: &WakeTuning,
    request: &WakeRequest,
    now: DateTime<Utc>,
) -> KeepsakeResult<RetrievalResult> {
    let agent = AgentId::parse(request.agent_id.as_str())?;
    let limit = tuning.clamp_limit(request.limit);
    let fetch = tuning.fetch_size(limit);
    let lenses = request
        .lens
        .as_deref()
        .map(|expr| parse_lenses(expr, tuning.max_lenses))
        .unwrap_or_default();

    // Three overlapping candidate sets; the critical query's ids are kept
    // for provenance before everything merges.
    let recent_rows = store.recent_for_agent(&agent, fetch)?;
    let salient_rows = store.salient_for_agent(&agent, fetch)?;
    let critical_rows = store.critical_for_agent(&agent, tuning.critical_salience, limit)?;
    let critical_ids: HashSet<ObservationId> =
        critical_rows.iter().map(|obs| obs.id.clone()).collect();

    // Dedup by id into an unordered keyed collection first; any copy will
    // do since all three queries read the same rows. Ordering is always
    // re-established explicitly afterwards.
    let mut by_id: HashMap<ObservationId, Observation> = HashMap::new();
    for obs in recent_rows
        .into_iter()
        .chain(salient_rows)
        .chain(critical_rows)
    {
        by_id.entry(obs.id.clone()).or_insert(obs);
    }
    let loaded_count = by_id.len();
    let loaded = canonical_order(by_id.into_values().collect(), now, tuning);

    let (recent, salient, hot) = build_tiers(&loaded, &lenses, limit, request.hot, now, tuning);

    let violations = check_invariants(&loaded, &recent, &salient, &hot, limit, tuning);
    let provenance = request.explain.then(|| {
        tag_provenance(
            &loaded,
            &ProvenanceContext {
                critical_ids: &critical_ids,
                recent: &recent,
                salient: &salient,
                hot: &hot,
                lenses: &lenses,
            },
            tuning,
        )
    });

    reinforce_tiers(store, &recent, &salient, &hot, tuning, now)?;

    tracing::debug!(
        agent = %agent,
        loaded = loaded_count,
        recent = recent.len(),
        salient = salient.len(),
        hot = hot.len(),
        "wake assembled"
    );

    Ok(RetrievalResult {
        agent_id: agent,
        recent,
        salient,
        hot,
        loaded: loaded_count,
        violations,
        provenance,
        generated_at: now,
    })
}

/// Filter, score, and slice the candidate list into the three tiers.
///
/// Takes the candidates in their canonical order; each tier re-ranks by
/// its own key, so the incoming order only matters as a stable baseline.
fn build_tiers(
    candidates: &[Observation],
    lenses: &[Lens],
    limit: usize,
    include_hot: bool,
    now: DateTime<Utc>,
    tuning: &WakeTuning,
) -> (
    Vec<ScoredObservation>,
    Vec<ScoredObservation>,
    Vec<ScoredObservation>,
) {
    let scored: Vec<ScoredObservation> = candidates
        .iter()
        .filter(|obs| passes_all(obs, lenses, tuning))
        .map(|obs| ScoredObservation {
            observation: obs.clone(),
            decayed_salience: decayed_salience(obs, now, tuning),
            hot_score: include_hot.then(|| hot_score(obs, now, tuning)),
        })
        .collect();

    let mut recent = scored.clone();
    rank_by(&mut recent, Direction::Descending, |s| {
        s.observation.created_at.timestamp_millis() as f64
    });
    recent.truncate(limit);

    let mut salient = scored.clone();
    rank_by(&mut salient, Direction::Descending, |s| {
        s.decayed_salience as f64
    });
    salient.truncate(limit);

    let mut hot = if include_hot { scored } else { Vec::new() };
    rank_by(&mut hot, Direction::Descending, |s| {
        s.hot_score.unwrap_or(f64::NEG_INFINITY)
    });
    hot.truncate(tuning.max_tier_limit);

    (recent, salient, hot)
}

/// Bump salience and stamp last_accessed for every record that surfaced.
///
/// Deliberately a sequence of independent per-record updates, not a batch
/// or transaction: partial application on failure is the documented
/// contract. Records deleted or superseded since loading are skipped by
/// the store's guarded predicate.
fn reinforce_tiers(
    store: &dyn RecordStore,
    recent: &[ScoredObservation],
    salient: &[ScoredObservation],
    hot: &[ScoredObservation],
    tuning: &WakeTuning,
    now: DateTime<Utc>,
) -> KeepsakeResult<()> {
    let mut ids: Vec<&ObservationId> = recent
        .iter()
        .chain(salient)
        .chain(hot)
        .map(|scored| &scored.observation.id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for id in ids {
        store.reinforce(id, tuning.reinforce_bonus, now)?;
    }
    Ok(())
}
