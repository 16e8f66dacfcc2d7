//! Cluster directory abstractions
//!
//! The directory is the replicated registry of nodes and of the
//! per-(node, database) status map. The health loop reads it and writes
//! single-key status upserts back into it.

mod directory;
mod error;
mod memory;
mod status;

pub use directory::ClusterDirectory;
pub use error::ClusterError;
pub use memory::InMemoryDirectory;
pub use status::{DbStatus, NodeStatus, StatusKey};
