//! SQLite record store for observation persistence.

use crate::migration::run_migrations;
use chrono::{DateTime, Utc};
use keepsake_types::error::{KeepsakeError, KeepsakeResult};
use keepsake_types::observation::{
    AgentId, Observation, ObservationId, ObservationKind, ObservationPatch, ObservationStatus,
};
use keepsake_types::store::RecordStore;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column list shared by every SELECT; the row mapper indexes into it.
const COLUMNS: &str = "id, agent_id, author, perspective, kind, content, salience, \
     emotion_intimacy, emotion_conflict, emotion_joy, emotion_fear, \
     created_at, updated_at, last_accessed, deleted_at, status, superseded_by, \
     pinned, source_platform, source_ref";

/// Predicate selecting records that participate in retrieval.
const ACTIVE: &str = "deleted_at IS NULL AND (status IS NULL OR status = 'active')";

/// Observation store backed by SQLite.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Create a new store wrapping the given connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path) -> KeepsakeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn =
            Connection::open(path).map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        run_migrations(&conn).map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        tracing::debug!(path = %path.display(), "observation store opened");
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Open a fresh in-memory store with the schema applied.
    pub fn open_in_memory() -> KeepsakeResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        run_migrations(&conn).map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Share the underlying connection, e.g. with the document store.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> KeepsakeResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KeepsakeError::Internal(e.to_string()))
    }

    fn query_observations(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> KeepsakeResult<Vec<Observation>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params, row_to_observation)
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(row.map_err(|e| KeepsakeError::Storage(e.to_string()))?);
        }
        Ok(observations)
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, obs: &Observation) -> KeepsakeResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO observations (id, agent_id, author, perspective, kind, content, salience, \
             emotion_intimacy, emotion_conflict, emotion_joy, emotion_fear, \
             created_at, updated_at, last_accessed, deleted_at, status, superseded_by, \
             pinned, source_platform, source_ref) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            rusqlite::params![
                obs.id.as_str(),
                obs.agent_id.as_str(),
                obs.author,
                obs.perspective,
                obs.kind.as_str(),
                obs.content,
                obs.salience,
                obs.emotions.intimacy,
                obs.emotions.conflict,
                obs.emotions.joy,
                obs.emotions.fear,
                obs.created_at.to_rfc3339(),
                obs.updated_at.to_rfc3339(),
                obs.last_accessed.map(|t| t.to_rfc3339()),
                obs.deleted_at.map(|t| t.to_rfc3339()),
                obs.status.as_str(),
                obs.superseded_by.as_ref().map(|id| id.as_str().to_string()),
                obs.pinned,
                obs.source_platform,
                obs.source_ref,
            ],
        )
        .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(())
    }

    fn get(&self, id: &ObservationId) -> KeepsakeResult<Option<Observation>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM observations WHERE id = ?1 AND deleted_at IS NULL"
            ))
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        match stmt.query_row(rusqlite::params![id.as_str()], row_to_observation) {
            Ok(obs) => Ok(Some(obs)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(KeepsakeError::Storage(e.to_string())),
        }
    }

    fn recent_for_agent(&self, agent: &AgentId, limit: usize) -> KeepsakeResult<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE agent_id = ?1 AND {ACTIVE} \
                 ORDER BY created_at DESC, id ASC LIMIT ?2"
            ),
            &[&agent.as_str(), &(limit as i64)],
        )
    }

    fn salient_for_agent(&self, agent: &AgentId, limit: usize) -> KeepsakeResult<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE agent_id = ?1 AND {ACTIVE} \
                 ORDER BY salience DESC, id ASC LIMIT ?2"
            ),
            &[&agent.as_str(), &(limit as i64)],
        )
    }

    fn critical_for_agent(
        &self,
        agent: &AgentId,
        min_salience: i64,
        limit: usize,
    ) -> KeepsakeResult<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE agent_id = ?1 AND (salience >= ?2 OR kind = 'correction') AND {ACTIVE} \
                 ORDER BY salience DESC, id ASC LIMIT ?3"
            ),
            &[&agent.as_str(), &min_salience, &(limit as i64)],
        )
    }

    fn superseded_for_agent(
        &self,
        agent: &AgentId,
        limit: usize,
    ) -> KeepsakeResult<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE agent_id = ?1 AND deleted_at IS NULL AND status = 'superseded' \
                 ORDER BY updated_at DESC, id ASC LIMIT ?2"
            ),
            &[&agent.as_str(), &(limit as i64)],
        )
    }

    fn apply_patch(
        &self,
        id: &ObservationId,
        patch: &ObservationPatch,
        bump: i64,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        // COALESCE keeps absent fields untouched; the bump lands on whatever
        // salience the patch leaves in place, clamped into range.
        let (intimacy, conflict, joy, fear) = match &patch.emotions {
            Some(e) => (Some(e.intimacy), Some(e.conflict), Some(e.joy), Some(e.fear)),
            None => (None, None, None, None),
        };
        let rows = conn
            .execute(
                &format!(
                    "UPDATE observations SET \
                     author = COALESCE(?1, author), \
                     perspective = COALESCE(?2, perspective), \
                     kind = COALESCE(?3, kind), \
                     content = COALESCE(?4, content), \
                     salience = MAX(0, MIN(100, COALESCE(?5, salience) + ?6)), \
                     emotion_intimacy = COALESCE(?7, emotion_intimacy), \
                     emotion_conflict = COALESCE(?8, emotion_conflict), \
                     emotion_joy = COALESCE(?9, emotion_joy), \
                     emotion_fear = COALESCE(?10, emotion_fear), \
                     source_platform = COALESCE(?11, source_platform), \
                     source_ref = COALESCE(?12, source_ref), \
                     updated_at = ?13 \
                     WHERE id = ?14 AND {ACTIVE}"
                ),
                rusqlite::params![
                    patch.author,
                    patch.perspective,
                    patch.kind.as_ref().map(|k| k.as_str().to_string()),
                    patch.content,
                    patch.salience,
                    bump,
                    intimacy,
                    conflict,
                    joy,
                    fear,
                    patch.source_platform,
                    patch.source_ref,
                    now.to_rfc3339(),
                    id.as_str(),
                ],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }

    fn set_pinned(
        &self,
        id: &ObservationId,
        pinned: bool,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                &format!(
                    "UPDATE observations SET pinned = ?1, updated_at = ?2 \
                     WHERE id = ?3 AND {ACTIVE}"
                ),
                rusqlite::params![pinned, now.to_rfc3339(), id.as_str()],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }

    fn reinforce(
        &self,
        id: &ObservationId,
        bonus: i64,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                &format!(
                    "UPDATE observations SET \
                     salience = MIN(100, salience + ?1), last_accessed = ?2 \
                     WHERE id = ?3 AND {ACTIVE}"
                ),
                rusqlite::params![bonus, now.to_rfc3339(), id.as_str()],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }

    fn mark_superseded(
        &self,
        target: &ObservationId,
        superseding: &ObservationId,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                &format!(
                    "UPDATE observations SET \
                     status = 'superseded', superseded_by = ?1, updated_at = ?2 \
                     WHERE id = ?3 AND {ACTIVE}"
                ),
                rusqlite::params![superseding.as_str(), now.to_rfc3339(), target.as_str()],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }

    fn soft_delete(&self, id: &ObservationId, now: DateTime<Utc>) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                "UPDATE observations SET deleted_at = ?1, updated_at = ?1 \
                 WHERE id = ?2 AND deleted_at IS NULL",
                rusqlite::params![now.to_rfc3339(), id.as_str()],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }

    fn hard_delete(&self, id: &ObservationId) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                "DELETE FROM observations WHERE id = ?1",
                rusqlite::params![id.as_str()],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }
}

/// Map one result row onto an Observation. Timestamps are stored as
/// RFC3339 text; malformed required timestamps fall back to now rather
/// than poisoning the whole read.
fn row_to_observation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Observation> {
    let kind: String = row.get(4)?;
    let status: Option<String> = row.get(15)?;
    Ok(Observation {
        id: ObservationId::from(row.get::<_, String>(0)?),
        agent_id: AgentId::from(row.get::<_, String>(1)?),
        author: row.get(2)?,
        perspective: row.get(3)?,
        kind: ObservationKind::from(kind.as_str()),
        content: row.get(5)?,
        salience: row.get(6)?,
        emotions: keepsake_types::observation::EmotionVector {
            intimacy: row.get(7)?,
            conflict: row.get(8)?,
            joy: row.get(9)?,
            fear: row.get(10)?,
        },
        created_at: parse_required_ts(&row.get::<_, String>(11)?),
        updated_at: parse_required_ts(&row.get::<_, String>(12)?),
        last_accessed: row.get::<_, Option<String>>(13)?.and_then(|s| parse_ts(&s)),
        deleted_at: row.get::<_, Option<String>>(14)?.and_then(|s| parse_ts(&s)),
        status: ObservationStatus::from_stored(status.as_deref()),
        superseded_by: row.get::<_, Option<String>>(16)?.map(ObservationId::from),
        pinned: row.get(17)?,
        source_platform: row.get(18)?,
        source_ref: row.get(19)?,
    })
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn parse_required_ts(raw: &str) -> DateTime<Utc> {
    parse_ts(raw).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keepsake_types::observation::{EmotionVector, NewObservation};

    fn setup() -> SqliteRecordStore {
        SqliteRecordStore::open_in_memory().unwrap()
    }

    fn make_obs(
        store: &SqliteRecordStore,
        agent: &str,
        content: &str,
        salience: i64,
        created_at: DateTime<Utc>,
    ) -> Observation {
        let obs = NewObservation {
            agent_id: AgentId::from(agent),
            author: "sam".to_string(),
            perspective: String::new(),
            kind: ObservationKind::Project,
            content: content.to_string(),
            salience,
            emotions: EmotionVector::default(),
            pinned: false,
            source_platform: None,
            source_ref: None,
        }
        .into_observation(created_at);
        store.insert(&obs).unwrap();
        obs
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let store = setup();
        let now = Utc::now();
        let mut obs = NewObservation {
            agent_id: AgentId::from("ada"),
            author: "sam".to_string(),
            perspective: "ada".to_string(),
            kind: ObservationKind::Other("dream".to_string()),
            content: "a full roundtrip".to_string(),
            salience: 55,
            emotions: EmotionVector {
                intimacy: 10,
                conflict: 20,
                joy: 30,
                fear: 40,
            },
            pinned: true,
            source_platform: Some("discord".to_string()),
            source_ref: Some("msg/123".to_string()),
        }
        .into_observation(now);
        obs.last_accessed = Some(now);
        store.insert(&obs).unwrap();

        let loaded = store.get(&obs.id).unwrap().unwrap();
        assert_eq!(loaded.content, "a full roundtrip");
        assert_eq!(loaded.kind, ObservationKind::Other("dream".to_string()));
        assert_eq!(loaded.emotions.fear, 40);
        assert!(loaded.pinned);
        assert_eq!(loaded.source_ref.as_deref(), Some("msg/123"));
        assert_eq!(loaded.status, ObservationStatus::Active);
        // RFC3339 text keeps sub-second precision through the roundtrip
        assert_eq!(loaded.created_at, obs.created_at);
        assert_eq!(loaded.last_accessed, Some(now));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = setup();
        assert!(store.get(&ObservationId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn test_recent_orders_newest_first_and_scopes_by_agent() {
        let store = setup();
        let base = Utc::now();
        let old = make_obs(&store, "ada", "old", 10, base - Duration::days(2));
        let new = make_obs(&store, "ada", "new", 10, base);
        make_obs(&store, "other", "foreign", 10, base);

        let recent = store.recent_for_agent(&AgentId::from("ada"), 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, new.id);
        assert_eq!(recent[1].id, old.id);
    }

    #[test]
    fn test_salient_orders_by_raw_salience() {
        let store = setup();
        let base = Utc::now();
        make_obs(&store, "ada", "low", 10, base);
        let high = make_obs(&store, "ada", "high", 90, base - Duration::days(5));
        let mid = make_obs(&store, "ada", "mid", 50, base);

        let salient = store.salient_for_agent(&AgentId::from("ada"), 2).unwrap();
        assert_eq!(salient.len(), 2);
        assert_eq!(salient[0].id, high.id);
        assert_eq!(salient[1].id, mid.id);
    }

    #[test]
    fn test_critical_selects_high_salience_and_corrections() {
        let store = setup();
        let base = Utc::now();
        make_obs(&store, "ada", "low", 79, base);
        let critical = make_obs(&store, "ada", "critical", 80, base);

        let mut correction = NewObservation {
            agent_id: AgentId::from("ada"),
            author: "sam".to_string(),
            perspective: String::new(),
            kind: ObservationKind::Correction,
            content: "actually, that was wrong".to_string(),
            salience: 20,
            emotions: EmotionVector::default(),
            pinned: false,
            source_platform: None,
            source_ref: None,
        }
        .into_observation(base);
        correction.id = ObservationId::from("zz-correction");
        store.insert(&correction).unwrap();

        let rows = store
            .critical_for_agent(&AgentId::from("ada"), 80, 10)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, critical.id);
        assert_eq!(rows[1].id, correction.id);
    }

    #[test]
    fn test_apply_patch_bumps_and_clamps_salience() {
        let store = setup();
        let now = Utc::now();
        let obs = make_obs(&store, "ada", "before", 99, now);

        let patch = ObservationPatch {
            content: Some("after".to_string()),
            ..Default::default()
        };
        let later = now + Duration::seconds(5);
        assert!(store.apply_patch(&obs.id, &patch, 2, later).unwrap());

        let loaded = store.get(&obs.id).unwrap().unwrap();
        assert_eq!(loaded.content, "after");
        assert_eq!(loaded.salience, 100); // 99 + 2 clamped
        assert_eq!(loaded.updated_at, later);
        assert_eq!(loaded.author, "sam"); // untouched
    }

    #[test]
    fn test_apply_patch_explicit_salience_then_bump() {
        let store = setup();
        let obs = make_obs(&store, "ada", "x", 40, Utc::now());
        let patch = ObservationPatch {
            salience: Some(60),
            ..Default::default()
        };
        store.apply_patch(&obs.id, &patch, 2, Utc::now()).unwrap();
        let loaded = store.get(&obs.id).unwrap().unwrap();
        assert_eq!(loaded.salience, 62);
    }

    #[test]
    fn test_reinforce_clamps_and_stamps_last_accessed() {
        let store = setup();
        let obs = make_obs(&store, "ada", "x", 99, Utc::now());
        let now = Utc::now();
        assert!(store.reinforce(&obs.id, 2, now).unwrap());
        let loaded = store.get(&obs.id).unwrap().unwrap();
        assert_eq!(loaded.salience, 100);
        assert_eq!(loaded.last_accessed, Some(now));
    }

    #[test]
    fn test_mark_superseded_only_once() {
        let store = setup();
        let old = make_obs(&store, "ada", "old belief", 50, Utc::now());
        let new = make_obs(&store, "ada", "new belief", 50, Utc::now());

        assert!(store.mark_superseded(&old.id, &new.id, Utc::now()).unwrap());
        // already superseded: the guarded update no longer matches
        assert!(!store.mark_superseded(&old.id, &new.id, Utc::now()).unwrap());

        let loaded = store.get(&old.id).unwrap().unwrap();
        assert_eq!(loaded.status, ObservationStatus::Superseded);
        assert_eq!(loaded.superseded_by, Some(new.id.clone()));

        // superseded records leave the active queries
        let recent = store.recent_for_agent(&AgentId::from("ada"), 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, new.id);

        let superseded = store
            .superseded_for_agent(&AgentId::from("ada"), 10)
            .unwrap();
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].id, old.id);
    }

    #[test]
    fn test_soft_delete_hides_record_everywhere() {
        let store = setup();
        let obs = make_obs(&store, "ada", "gone soon", 90, Utc::now());
        assert!(store.soft_delete(&obs.id, Utc::now()).unwrap());
        assert!(!store.soft_delete(&obs.id, Utc::now()).unwrap());

        assert!(store.get(&obs.id).unwrap().is_none());
        assert!(store.recent_for_agent(&AgentId::from("ada"), 10).unwrap().is_empty());
        assert!(store.salient_for_agent(&AgentId::from("ada"), 10).unwrap().is_empty());
        assert!(store
            .critical_for_agent(&AgentId::from("ada"), 80, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_hard_delete_removes_the_row() {
        let store = setup();
        let obs = make_obs(&store, "ada", "ephemeral", 50, Utc::now());
        assert!(store.hard_delete(&obs.id).unwrap());
        assert!(!store.hard_delete(&obs.id).unwrap());
        assert!(store.get(&obs.id).unwrap().is_none());

        // soft-deleted rows can still be purged
        let obs = make_obs(&store, "ada", "buried", 50, Utc::now());
        store.soft_delete(&obs.id, Utc::now()).unwrap();
        assert!(store.hard_delete(&obs.id).unwrap());
    }

    #[test]
    fn test_updates_on_missing_rows_report_no_match() {
        let store = setup();
        let id = ObservationId::from("ghost");
        assert!(!store.set_pinned(&id, true, Utc::now()).unwrap());
        assert!(!store.reinforce(&id, 2, Utc::now()).unwrap());
        assert!(!store
            .apply_patch(&id, &ObservationPatch::default(), 2, Utc::now())
            .unwrap());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keepsake.db");
        let obs_id;
        {
            let store = SqliteRecordStore::open(&path).unwrap();
            let obs = make_obs(&store, "ada", "durable", 50, Utc::now());
            obs_id = obs.id;
        }
        let store = SqliteRecordStore::open(&path).unwrap();
        let loaded = store.get(&obs_id).unwrap().unwrap();
        assert_eq!(loaded.content, "durable");
    }
}
