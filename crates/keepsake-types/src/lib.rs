//! Core types and contracts for the Keepsake observation memory.
//!
//! This crate defines the shared data structures used across the Keepsake
//! store, retrieval engine, HTTP API, and CLI. It contains no business logic.

pub mod config;
pub mod error;
pub mod lens;
pub mod observation;
pub mod retrieval;
pub mod store;

pub use error::{KeepsakeError, KeepsakeResult, SupersessionError};
pub use observation::{
    AgentId, EmotionVector, NewObservation, Observation, ObservationId, ObservationKind,
    ObservationPatch, ObservationStatus,
};
