//! Decay and heat scoring: pure functions over a record and a clock.
//!
//! Salience fades through disuse, never through age alone. Hot scores mix
//! decayed salience with emotional charge and a short-lived freshness
//! boost; they exist only for ranking and are never written back.

use chrono::{DateTime, Utc};
use keepsake_types::config::WakeTuning;
use keepsake_types::observation::Observation;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Effective salience after time decay.
///
/// Pinned records keep their raw salience. Otherwise each whole decay
/// period elapsed since the record was last surfaced costs one decay
/// step, floored at zero. A record that was never accessed has seen
/// zero periods and does not decay.
pub fn decayed_salience(obs: &Observation, now: DateTime<Utc>, tuning: &WakeTuning) -> i64 {
    if obs.pinned {
        return obs.salience;
    }
    let reference = obs.last_accessed.unwrap_or(now);
    let elapsed_days = (now - reference).num_days().max(0);
    let periods = if tuning.decay_period_days > 0 {
        elapsed_days / tuning.decay_period_days
    } else {
        0
    };
    (obs.salience - tuning.decay_step * periods).max(0)
}

/// Emotional-charge ranking score.
///
/// `decayed + 0.4 x (intimacy + joy) - 0.2 x (fear + conflict) + boost`,
/// where the boost fades linearly from 1 to 0 over the hot decay window.
/// Unbounded; only relative order matters.
pub fn hot_score(obs: &Observation, now: DateTime<Utc>, tuning: &WakeTuning) -> f64 {
    let decayed = decayed_salience(obs, now, tuning) as f64;
    let lift = 0.4 * (obs.emotions.intimacy + obs.emotions.joy) as f64;
    let drag = 0.2 * (obs.emotions.fear + obs.emotions.conflict) as f64;
    let age_days = (now - obs.created_at).num_seconds() as f64 / SECONDS_PER_DAY;
    let recency_boost = (1.0 - age_days / tuning.hot_decay_window_days).max(0.0);
    decayed + lift - drag + recency_boost
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keepsake_types::observation::{AgentId, EmotionVector, NewObservation, ObservationKind};

    fn obs(salience: i64, pinned: bool) -> Observation {
        NewObservation {
            agent_id: AgentId::from("ada"),
            author: "sam".to_string(),
            perspective: String::new(),
            kind: ObservationKind::Project,
            content: "x".to_string(),
            salience,
            emotions: EmotionVector::default(),
            pinned,
            source_platform: None,
            source_ref: None,
        }
        .into_observation(Utc::now())
    }

    #[test]
    fn test_never_accessed_records_do_not_decay() {
        let tuning = WakeTuning::default();
        let record = obs(70, false);
        let far_future = Utc::now() + Duration::days(365);
        assert_eq!(decayed_salience(&record, far_future, &tuning), 70);
    }

    #[test]
    fn test_decay_steps_per_whole_period() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(70, false);
        record.last_accessed = Some(now - Duration::days(29));
        assert_eq!(decayed_salience(&record, now, &tuning), 70);
        record.last_accessed = Some(now - Duration::days(30));
        assert_eq!(decayed_salience(&record, now, &tuning), 60);
        record.last_accessed = Some(now - Duration::days(89));
        assert_eq!(decayed_salience(&record, now, &tuning), 50);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(15, false);
        record.last_accessed = Some(now - Duration::days(300));
        assert_eq!(decayed_salience(&record, now, &tuning), 0);
    }

    #[test]
    fn test_decay_is_monotone_in_elapsed_time() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(90, false);
        let mut last = i64::MAX;
        for days in [0, 10, 30, 45, 60, 120, 400] {
            record.last_accessed = Some(now - Duration::days(days));
            let decayed = decayed_salience(&record, now, &tuning);
            assert!(decayed <= last, "decay must not increase with elapsed time");
            last = decayed;
        }
    }

    #[test]
    fn test_pinned_records_never_decay() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(40, true);
        record.last_accessed = Some(now - Duration::days(900));
        assert_eq!(decayed_salience(&record, now, &tuning), 40);
    }

    #[test]
    fn test_hot_score_arithmetic() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(50, false);
        record.created_at = now;
        record.emotions = EmotionVector {
            intimacy: 30,
            joy: 20,
            fear: 10,
            conflict: 5,
        };
        // 50 + 0.4*50 - 0.2*15 + 1.0
        let score = hot_score(&record, now, &tuning);
        assert!((score - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_recency_boost_fades_over_window() {
        let tuning = WakeTuning::default();
        let now = Utc::now();
        let mut record = obs(0, false);

        record.created_at = now - Duration::days(7);
        let halfway = hot_score(&record, now, &tuning);
        assert!((halfway - 0.5).abs() < 1e-9);

        record.created_at = now - Duration::days(30);
        let stale = hot_score(&record, now, &tuning);
        assert_eq!(stale, 0.0);
    }
}
