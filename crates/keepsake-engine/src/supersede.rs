//! Supersession: marking one record as replaced by another.
//!
//! The only mutation that removes a record from the active result space
//! without deleting it. Validation reads both records first, then issues
//! one conditional write; a concurrent racer that deleted or superseded
//! the target between the read and the write silently wins.

use chrono::{DateTime, Utc};
use keepsake_types::error::{KeepsakeResult, SupersessionError};
use keepsake_types::observation::{Observation, ObservationId, ObservationStatus};
use keepsake_types::store::RecordStore;

/// Mark `target` as superseded by `superseding`.
///
/// The checks run in a fixed order so clients see stable rejection codes.
/// The cycle guard runs before the status checks: after A is superseded
/// by B, asking to supersede B by A must report the cycle rather than
/// complain that A is already superseded.
pub fn supersede(
    store: &dyn RecordStore,
    target_id: &ObservationId,
    superseding_id: &ObservationId,
    now: DateTime<Utc>,
) -> KeepsakeResult<()> {
    if target_id == superseding_id {
        return Err(SupersessionError::SelfSupersession.into());
    }

    let superseding = store
        .get(superseding_id)?
        .ok_or(SupersessionError::SupersedingNotFound)?;
    let target = store
        .get(target_id)?
        .ok_or(SupersessionError::TargetNotFound)?;

    if points_at(&superseding, target_id) || points_at(&target, superseding_id) {
        return Err(SupersessionError::CircularSupersession.into());
    }
    if superseding.status == ObservationStatus::Superseded {
        return Err(SupersessionError::SupersedingIsSuperseded.into());
    }
    if target.status == ObservationStatus::Superseded {
        return Err(SupersessionError::TargetAlreadySuperseded.into());
    }

    let applied = store.mark_superseded(target_id, superseding_id, now)?;
    if !applied {
        // a concurrent delete or supersede got there first; their outcome
        // stands and this call still succeeded from the caller's view
        tracing::debug!(
            target = %target_id,
            superseding = %superseding_id,
            "supersession write matched no row; racer won"
        );
    } else {
        tracing::info!(target = %target_id, superseding = %superseding_id, "record superseded");
    }
    Ok(())
}

fn points_at(obs: &Observation, successor: &ObservationId) -> bool {
    obs.superseded_by.as_ref() == Some(successor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_store::SqliteRecordStore;
    use keepsake_types::error::KeepsakeError;
    use keepsake_types::observation::{AgentId, EmotionVector, NewObservation, ObservationKind};

    fn setup() -> SqliteRecordStore {
        SqliteRecordStore::open_in_memory().unwrap()
    }

    fn make_obs(store: &SqliteRecordStore, content: &str) -> Observation {
        let obs = NewObservation {
            agent_id: AgentId::from("ada"),
            author: "sam".to_string(),
            perspective: String::new(),
            kind: ObservationKind::Project,
            content: content.to_string(),
            salience: 50,
            emotions: EmotionVector::default(),
            pinned: false,
            source_platform: None,
            source_ref: None,
        }
        .into_observation(Utc::now());
        store.insert(&obs).unwrap();
        obs
    }

    fn rejection(result: KeepsakeResult<()>) -> SupersessionError {
        match result {
            Err(KeepsakeError::Supersession(e)) => e,
            other => panic!("expected supersession rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_successful_supersession() {
        let store = setup();
        let old = make_obs(&store, "old belief");
        let new = make_obs(&store, "new belief");

        supersede(&store, &old.id, &new.id, Utc::now()).unwrap();

        let loaded = store.superseded_for_agent(&AgentId::from("ada"), 10).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, old.id);
        assert_eq!(loaded[0].superseded_by, Some(new.id));
    }

    #[test]
    fn test_self_supersession_rejected_and_state_untouched() {
        let store = setup();
        let obs = make_obs(&store, "me");
        let err = rejection(supersede(&store, &obs.id, &obs.id, Utc::now()));
        assert_eq!(err, SupersessionError::SelfSupersession);

        let loaded = store.get(&obs.id).unwrap().unwrap();
        assert_eq!(loaded.status, ObservationStatus::Active);
        assert!(loaded.superseded_by.is_none());
    }

    #[test]
    fn test_missing_records_rejected() {
        let store = setup();
        let present = make_obs(&store, "here");
        let ghost = ObservationId::from("ghost");

        let err = rejection(supersede(&store, &present.id, &ghost, Utc::now()));
        assert_eq!(err, SupersessionError::SupersedingNotFound);

        let err = rejection(supersede(&store, &ghost, &present.id, Utc::now()));
        assert_eq!(err, SupersessionError::TargetNotFound);
    }

    #[test]
    fn test_soft_deleted_records_read_as_missing() {
        let store = setup();
        let alive = make_obs(&store, "alive");
        let buried = make_obs(&store, "buried");
        store.soft_delete(&buried.id, Utc::now()).unwrap();

        let err = rejection(supersede(&store, &buried.id, &alive.id, Utc::now()));
        assert_eq!(err, SupersessionError::TargetNotFound);
    }

    #[test]
    fn test_two_step_cycle_detected() {
        let store = setup();
        let a = make_obs(&store, "a");
        let b = make_obs(&store, "b");

        supersede(&store, &a.id, &b.id, Utc::now()).unwrap();
        // A now points at B; B superseded by A would close the loop,
        // and the cycle code wins over TARGET-style status codes
        let err = rejection(supersede(&store, &b.id, &a.id, Utc::now()));
        assert_eq!(err, SupersessionError::CircularSupersession);
    }

    #[test]
    fn test_superseded_records_cannot_participate() {
        let store = setup();
        let a = make_obs(&store, "a");
        let b = make_obs(&store, "b");
        let c = make_obs(&store, "c");
        supersede(&store, &a.id, &b.id, Utc::now()).unwrap();

        // a is superseded: it can neither supersede nor be re-superseded
        let err = rejection(supersede(&store, &c.id, &a.id, Utc::now()));
        assert_eq!(err, SupersessionError::SupersedingIsSuperseded);

        let err = rejection(supersede(&store, &a.id, &c.id, Utc::now()));
        assert_eq!(err, SupersessionError::TargetAlreadySuperseded);
    }

    #[test]
    fn test_independent_chains_are_allowed() {
        let store = setup();
        let a = make_obs(&store, "a");
        let b = make_obs(&store, "b");
        let c = make_obs(&store, "c");

        supersede(&store, &a.id, &b.id, Utc::now()).unwrap();
        // b -> c extends the chain; no cycle involved
        supersede(&store, &b.id, &c.id, Utc::now()).unwrap();

        let superseded = store.superseded_for_agent(&AgentId::from("ada"), 10).unwrap();
        assert_eq!(superseded.len(), 2);
    }

    #[test]
    fn test_racing_delete_silently_wins() {
        let store = setup();
        let old = make_obs(&store, "old");
        let new = make_obs(&store, "new");

        // simulate a racer deleting the target after validation would have
        // passed: with the row gone at write time the call still succeeds
        store.soft_delete(&old.id, Utc::now()).unwrap();
        let err = rejection(supersede(&store, &old.id, &new.id, Utc::now()));
        // via the public path the lookup already misses; exercise the
        // conditional write directly to model the race window
        assert_eq!(err, SupersessionError::TargetNotFound);
        assert!(!store.mark_superseded(&old.id, &new.id, Utc::now()).unwrap());
    }
}
