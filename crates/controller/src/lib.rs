//! Right-sizing controller
//!
//! Runs the reconciler against the hub cluster and serves health and
//! metrics endpoints.

pub mod api;
pub mod config;
pub mod triggers;
