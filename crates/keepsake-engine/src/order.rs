//! Deterministic ordering: one reusable total-order sort, plus the
//! canonical pre-scoring pass that settles conflicts between records.
//!
//! Scores are often whole numbers or decay to identical values, so every
//! sort in the pipeline falls through to creation time (newest first) and
//! then id (lexicographic) to stay reproducible across calls.

use crate::scoring::decayed_salience;
use chrono::{DateTime, Utc};
use keepsake_types::config::WakeTuning;
use keepsake_types::observation::{Observation, ObservationKind};
use keepsake_types::retrieval::ScoredObservation;
use std::cmp::Ordering;

/// Items the deterministic comparator can rank.
pub trait Rankable {
    /// Creation time, used as the first tie-break (newest first).
    fn ranked_created_at(&self) -> DateTime<Utc>;
    /// Record id, used as the final tie-break (ascending).
    fn ranked_id(&self) -> &str;
}

impl Rankable for Observation {
    fn ranked_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn ranked_id(&self) -> &str {
        self.id.as_str()
    }
}

impl Rankable for ScoredObservation {
    fn ranked_created_at(&self) -> DateTime<Utc> {
        self.observation.created_at
    }
    fn ranked_id(&self) -> &str {
        self.observation.id.as_str()
    }
}

/// Sort direction for the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest key first.
    Ascending,
    /// Largest key first.
    Descending,
}

/// Sort by a numeric key with deterministic tie-breaks.
///
/// The key is compared with `total_cmp` so NaN scores still produce a
/// total order instead of panicking; ties fall through to creation time
/// descending, then id ascending.
pub fn rank_by<T: Rankable>(items: &mut [T], direction: Direction, key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| {
        let primary = match direction {
            Direction::Ascending => key(a).total_cmp(&key(b)),
            Direction::Descending => key(b).total_cmp(&key(a)),
        };
        primary
            .then_with(|| b.ranked_created_at().cmp(&a.ranked_created_at()))
            .then_with(|| a.ranked_id().cmp(b.ranked_id()))
    });
}

/// Pairwise canonical comparison: corrections first, then clearly higher
/// decayed salience, with near-ties (within the tuning window) falling
/// through to creation time descending and id ascending.
fn canonical_cmp(
    a: &Observation,
    a_decayed: i64,
    b: &Observation,
    b_decayed: i64,
    tuning: &WakeTuning,
) -> Ordering {
    let a_correction = a.kind == ObservationKind::Correction;
    let b_correction = b.kind == ObservationKind::Correction;
    if a_correction != b_correction {
        return if a_correction {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    if (a_decayed - b_decayed).abs() >= tuning.near_tie_window {
        return b_decayed.cmp(&a_decayed);
    }
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.as_str().cmp(b.id.as_str()))
}

/// The canonical starting order for the deduplicated candidate set.
///
/// The near-tie rule makes this comparator non-transitive (a can tie b,
/// b tie c, yet a and c compare unequal), so a plain `sort_by` is off the
/// table; instead each record is inserted behind its last pairwise
/// predecessor, which is stable and never panics.
pub fn canonical_order(
    records: Vec<Observation>,
    now: DateTime<Utc>,
    tuning: &WakeTuning,
) -> Vec<Observation> {
    let mut ordered: Vec<(Observation, i64)> = Vec::with_capacity(records.len());
    for record in records {
        let decayed = decayed_salience(&record, now, tuning);
        let mut pos = ordered.len();
        while pos > 0 {
            let (prev, prev_decayed) = &ordered[pos - 1];
            if canonical_cmp(&record, decayed, prev, *prev_decayed, tuning) == Ordering::Less {
                pos -= 1;
            } else {
                break;
            }
        }
        ordered.insert(pos, (record, decayed));
    }
    ordered.into_iter().map(|(record, _)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keepsake_types::observation::{AgentId, EmotionVector, NewObservation, ObservationId};

    fn obs(id: &str, salience: i64, created_at: DateTime<Utc>) -> Observation {
        let mut record = NewObservation {
            agent_id: AgentId::from("ada"),
            author: "sam".to_string(),
            perspective: String::new(),
            kind: ObservationKind::Project,
            content: "x".to_string(),
            salience,
            emotions: EmotionVector::default(),
            pinned: false,
            source_platform: None,
            source_ref: None,
        }
        .into_observation(created_at);
        record.id = ObservationId::from(id);
        record
    }

    #[test]
    fn test_rank_by_descending_with_tie_breaks() {
        let now = Utc::now();
        let mut records = vec![
            obs("b", 50, now - Duration::days(1)),
            obs("a", 50, now - Duration::days(1)),
            obs("c", 50, now),
            obs("d", 90, now - Duration::days(9)),
        ];
        rank_by(&mut records, Direction::Descending, |o| o.salience as f64);
        let ids: Vec<&str> = records.iter().map(|o| o.id.as_str()).collect();
        // highest salience first, then newest, then id ascending
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_rank_by_is_reproducible() {
        let now = Utc::now();
        let build = || {
            vec![
                obs("c", 10, now),
                obs("a", 10, now),
                obs("b", 10, now),
            ]
        };
        let mut first = build();
        let mut second = build();
        second.reverse();
        rank_by(&mut first, Direction::Ascending, |o| o.salience as f64);
        rank_by(&mut second, Direction::Ascending, |o| o.salience as f64);
        let ids = |v: &[Observation]| v.iter().map(|o| o.id.as_str().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec!["a", "b", "c"]);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_rank_by_survives_nan_keys() {
        let now = Utc::now();
        let mut records = vec![obs("a", 0, now), obs("b", 0, now)];
        rank_by(&mut records, Direction::Descending, |_| f64::NAN);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_canonical_order_puts_corrections_first() {
        let now = Utc::now();
        let tuning = WakeTuning::default();
        let mut correction = obs("zz", 5, now - Duration::days(3));
        correction.kind = ObservationKind::Correction;
        let records = vec![obs("aa", 95, now), correction];

        let ordered = canonical_order(records, now, &tuning);
        assert_eq!(ordered[0].id.as_str(), "zz");
        assert_eq!(ordered[1].id.as_str(), "aa");
    }

    #[test]
    fn test_canonical_order_separates_clear_salience_gaps() {
        let now = Utc::now();
        let tuning = WakeTuning::default();
        let records = vec![obs("low", 20, now), obs("high", 80, now - Duration::days(5))];
        let ordered = canonical_order(records, now, &tuning);
        assert_eq!(ordered[0].id.as_str(), "high");
    }

    #[test]
    fn test_canonical_order_near_ties_break_by_recency_then_id() {
        let now = Utc::now();
        let tuning = WakeTuning::default();
        // 55 vs 50 is inside the near-tie window, so the newer record wins
        let records = vec![
            obs("older-but-higher", 55, now - Duration::days(2)),
            obs("newer", 50, now),
        ];
        let ordered = canonical_order(records, now, &tuning);
        assert_eq!(ordered[0].id.as_str(), "newer");

        let records = vec![obs("b", 52, now), obs("a", 50, now)];
        let ordered = canonical_order(records, now, &tuning);
        assert_eq!(ordered[0].id.as_str(), "a");
    }

    #[test]
    fn test_canonical_order_gap_equal_to_window_is_not_a_tie() {
        let now = Utc::now();
        let tuning = WakeTuning::default();
        // gap of exactly near_tie_window is a clear difference, so the
        // higher salience wins even against a newer record
        let records = vec![
            obs("newer", 50, now),
            obs("older-but-higher", 60, now - Duration::days(2)),
        ];
        let ordered = canonical_order(records, now, &tuning);
        assert_eq!(ordered[0].id.as_str(), "older-but-higher");
    }
}
