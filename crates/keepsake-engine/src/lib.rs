//! Retrieval, ranking, and supersession engine for Keepsake.
//!
//! The engine is stateless: every function takes the store and tuning
//! explicitly and treats one call as one unit of work. The wake pipeline
//! lives in [`wake`], the supersession state machine in [`supersede`],
//! and the response shaping in [`present`].

pub mod audit;
pub mod order;
pub mod present;
pub mod scoring;
pub mod supersede;
pub mod wake;

pub use present::{context_view, digest_view, Shape};
pub use supersede::supersede;
pub use wake::wake;
