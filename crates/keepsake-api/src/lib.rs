//! HTTP boundary for the Keepsake observation memory.
//!
//! A thin axum layer: route table, parameter extraction, and error-to-
//! status mapping. All retrieval and lifecycle logic lives in
//! `keepsake-engine`; nothing here touches SQL.

pub mod routes;
pub mod server;

pub use routes::{router, AppState};
pub use server::serve;
