//! SQLite persistence for the Keepsake observation memory.
//!
//! One database file holds two tables: `observations` (the records the
//! retrieval engine ranks) and `agent_docs` (standing markdown documents
//! served verbatim). Every operation is a single guarded statement; there
//! are no cross-statement transactions anywhere in the crate.

pub mod docs;
pub mod migration;
pub mod sqlite;

pub use docs::DocStore;
pub use sqlite::SqliteRecordStore;
