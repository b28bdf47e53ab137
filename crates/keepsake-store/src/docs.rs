//! Per-agent standing documents: identity notes, practices, working
//! agreements. Served verbatim; never ranked or decayed.

use chrono::{DateTime, Utc};
use keepsake_types::error::{KeepsakeError, KeepsakeResult};
use keepsake_types::observation::AgentId;
use keepsake_types::store::AgentDoc;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Document store backed by the shared SQLite connection.
#[derive(Clone)]
pub struct DocStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocStore {
    /// Create a new document store wrapping the given connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> KeepsakeResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KeepsakeError::Internal(e.to_string()))
    }

    /// Fetch one document by key.
    pub fn get(&self, agent: &AgentId, key: &str) -> KeepsakeResult<Option<AgentDoc>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT content, updated_at FROM agent_docs WHERE agent_id = ?1 AND key = ?2")
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        let result = stmt.query_row(rusqlite::params![agent.as_str(), key], |row| {
            let content: String = row.get(0)?;
            let updated_at: String = row.get(1)?;
            Ok((content, updated_at))
        });
        match result {
            Ok((content, updated_at)) => Ok(Some(AgentDoc {
                agent_id: agent.clone(),
                key: key.to_string(),
                content,
                updated_at: parse_ts(&updated_at),
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(KeepsakeError::Storage(e.to_string())),
        }
    }

    /// Create or replace a document.
    pub fn put(
        &self,
        agent: &AgentId,
        key: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> KeepsakeResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO agent_docs (agent_id, key, content, updated_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(agent_id, key) DO UPDATE SET content = ?3, updated_at = ?4",
            rusqlite::params![agent.as_str(), key, content, now.to_rfc3339()],
        )
        .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List all documents for an agent, ordered by key.
    pub fn list(&self, agent: &AgentId) -> KeepsakeResult<Vec<AgentDoc>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT key, content, updated_at FROM agent_docs WHERE agent_id = ?1 ORDER BY key",
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params![agent.as_str()], |row| {
                let key: String = row.get(0)?;
                let content: String = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((key, content, updated_at))
            })
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;

        let mut docs = Vec::new();
        for row in rows {
            let (key, content, updated_at) =
                row.map_err(|e| KeepsakeError::Storage(e.to_string()))?;
            docs.push(AgentDoc {
                agent_id: agent.clone(),
                key,
                content,
                updated_at: parse_ts(&updated_at),
            });
        }
        Ok(docs)
    }

    /// Delete a document. Returns false when it did not exist.
    pub fn delete(&self, agent: &AgentId, key: &str) -> KeepsakeResult<bool> {
        let conn = self.lock()?;
        let rows = conn
            .execute(
                "DELETE FROM agent_docs WHERE agent_id = ?1 AND key = ?2",
                rusqlite::params![agent.as_str(), key],
            )
            .map_err(|e| KeepsakeError::Storage(e.to_string()))?;
        Ok(rows > 0)
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::run_migrations;

    fn setup() -> DocStore {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        DocStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_put_get() {
        let store = setup();
        let agent = AgentId::from("ada");
        store
            .put(&agent, "identity", "# Who I am\n", Utc::now())
            .unwrap();
        let doc = store.get(&agent, "identity").unwrap().unwrap();
        assert_eq!(doc.content, "# Who I am\n");
        assert_eq!(doc.key, "identity");
    }

    #[test]
    fn test_get_missing() {
        let store = setup();
        assert!(store.get(&AgentId::from("ada"), "nope").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let store = setup();
        let agent = AgentId::from("ada");
        store.put(&agent, "practice", "v1", Utc::now()).unwrap();
        store.put(&agent, "practice", "v2", Utc::now()).unwrap();
        let doc = store.get(&agent, "practice").unwrap().unwrap();
        assert_eq!(doc.content, "v2");
        assert_eq!(store.list(&agent).unwrap().len(), 1);
    }

    #[test]
    fn test_list_is_scoped_and_ordered() {
        let store = setup();
        let ada = AgentId::from("ada");
        store.put(&ada, "b-practice", "x", Utc::now()).unwrap();
        store.put(&ada, "a-identity", "y", Utc::now()).unwrap();
        store
            .put(&AgentId::from("other"), "identity", "z", Utc::now())
            .unwrap();

        let docs = store.list(&ada).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].key, "a-identity");
        assert_eq!(docs[1].key, "b-practice");
    }

    #[test]
    fn test_delete() {
        let store = setup();
        let agent = AgentId::from("ada");
        store.put(&agent, "scratch", "x", Utc::now()).unwrap();
        assert!(store.delete(&agent, "scratch").unwrap());
        assert!(!store.delete(&agent, "scratch").unwrap());
        assert!(store.get(&agent, "scratch").unwrap().is_none());
    }
}
