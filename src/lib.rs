//! Periodic health checking and self-healing for replicated database clusters

pub mod cluster;
pub mod config;
pub mod health;
pub mod heartbeat;
pub mod metrics;
