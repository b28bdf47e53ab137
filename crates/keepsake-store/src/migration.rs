//! SQLite schema creation and migration.
//!
//! Creates all tables needed by the observation store on first boot.

use rusqlite::Connection;

/// Current schema version.
const SCHEMA_VERSION: u32 = 2;

/// Run all migrations to bring the database up to date.
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version = get_schema_version(conn);
    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "applying schema migrations"
        );
    }

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0)
}

/// Check if a column exists in a table (SQLite has no ADD COLUMN IF NOT EXISTS).
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let sql = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&sql) else {
        return false;
    };
    let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let names: Vec<String> = rows.filter_map(|r| r.ok()).collect();
    names.iter().any(|n| n == column)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "user_version", version)
}

/// Version 1: Create the observation and document tables.
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Observation records
        CREATE TABLE IF NOT EXISTS observations (
            id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL,
            author TEXT NOT NULL,
            perspective TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL DEFAULT 'system',
            content TEXT NOT NULL,
            salience INTEGER NOT NULL DEFAULT 0,
            emotion_intimacy INTEGER NOT NULL DEFAULT 0,
            emotion_conflict INTEGER NOT NULL DEFAULT 0,
            emotion_joy INTEGER NOT NULL DEFAULT 0,
            emotion_fear INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_accessed TEXT,
            deleted_at TEXT,
            status TEXT,
            superseded_by TEXT,
            pinned INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_observations_agent ON observations(agent_id);
        CREATE INDEX IF NOT EXISTS idx_observations_agent_created
            ON observations(agent_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_observations_agent_salience
            ON observations(agent_id, salience DESC);

        -- Standing documents (per-agent)
        CREATE TABLE IF NOT EXISTS agent_docs (
            agent_id TEXT NOT NULL,
            key TEXT NOT NULL,
            content TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, key)
        );

        -- Migration tracking
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT
        );

        INSERT OR IGNORE INTO migrations (version, applied_at, description)
        VALUES (1, datetime('now'), 'Initial schema');
        ",
    )?;
    Ok(())
}

/// Version 2: Add source attribution columns to observations.
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    // SQLite requires one ALTER TABLE per statement; check before adding
    let cols = [
        ("source_platform", "TEXT DEFAULT NULL"),
        ("source_ref", "TEXT DEFAULT NULL"),
    ];
    for (name, typedef) in &cols {
        if !column_exists(conn, "observations", name) {
            conn.execute(
                &format!("ALTER TABLE observations ADD COLUMN {} {}", name, typedef),
                [],
            )?;
        }
    }

    conn.execute(
        "INSERT OR IGNORE INTO migrations (version, applied_at, description) VALUES (2, datetime('now'), 'Add source attribution columns to observations')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // Verify tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"observations".to_string()));
        assert!(tables.contains(&"agent_docs".to_string()));
        assert!(tables.contains(&"migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap(); // Should not error
    }

    #[test]
    fn test_migration_adds_source_columns_to_v1_database() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_v1(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();
        assert!(!column_exists(&conn, "observations", "source_platform"));

        run_migrations(&conn).unwrap();
        assert!(column_exists(&conn, "observations", "source_platform"));
        assert!(column_exists(&conn, "observations", "source_ref"));
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }
}
