//! Storage contract: the trait the retrieval engine and API speak to.

use crate::error::KeepsakeResult;
use crate::observation::{AgentId, Observation, ObservationId, ObservationPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persistence surface for observation records.
///
/// Implementations are synchronous; every method is one unit of work
/// against the store with no cross-call transaction. Mutating methods
/// return `Ok(false)` when the row no longer matched the guarded
/// predicate, which callers treat as not-found or as a benign race.
pub trait RecordStore: Send + Sync {
    /// Persist a new record.
    fn insert(&self, obs: &Observation) -> KeepsakeResult<()>;

    /// Fetch one record by id. Soft-deleted records read as absent.
    fn get(&self, id: &ObservationId) -> KeepsakeResult<Option<Observation>>;

    /// Active records for an agent, newest creation first.
    fn recent_for_agent(&self, agent: &AgentId, limit: usize) -> KeepsakeResult<Vec<Observation>>;

    /// Active records for an agent, highest raw salience first.
    fn salient_for_agent(&self, agent: &AgentId, limit: usize) -> KeepsakeResult<Vec<Observation>>;

    /// Active records at or above a raw salience floor, plus corrections
    /// regardless of salience, highest salience first.
    fn critical_for_agent(
        &self,
        agent: &AgentId,
        min_salience: i64,
        limit: usize,
    ) -> KeepsakeResult<Vec<Observation>>;

    /// Superseded records for an agent, most recently updated first.
    fn superseded_for_agent(
        &self,
        agent: &AgentId,
        limit: usize,
    ) -> KeepsakeResult<Vec<Observation>>;

    /// Apply a field patch to an active record and bump its salience.
    fn apply_patch(
        &self,
        id: &ObservationId,
        patch: &ObservationPatch,
        bump: i64,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool>;

    /// Pin or unpin an active record.
    fn set_pinned(&self, id: &ObservationId, pinned: bool, now: DateTime<Utc>)
        -> KeepsakeResult<bool>;

    /// Add the reinforcement bonus and stamp last_accessed on an active record.
    fn reinforce(&self, id: &ObservationId, bonus: i64, now: DateTime<Utc>)
        -> KeepsakeResult<bool>;

    /// Mark `target` as superseded by `superseding`, if it is still active.
    fn mark_superseded(
        &self,
        target: &ObservationId,
        superseding: &ObservationId,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool>;

    /// Soft-delete a record that is not already deleted.
    fn soft_delete(&self, id: &ObservationId, now: DateTime<Utc>) -> KeepsakeResult<bool>;

    /// Physically remove a row. Ids are never reused afterwards.
    fn hard_delete(&self, id: &ObservationId) -> KeepsakeResult<bool>;
}

/// A named markdown document attached to an agent.
///
/// Docs hold standing context (identity, practices) that is served
/// verbatim; they do not flow through the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDoc {
    /// Which agent the document belongs to.
    pub agent_id: AgentId,
    /// Document key, unique per agent.
    pub key: String,
    /// Markdown body.
    pub content: String,
    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}
