//! Command implementations.

pub mod doc;
pub mod init;
pub mod observation;
pub mod wake;
