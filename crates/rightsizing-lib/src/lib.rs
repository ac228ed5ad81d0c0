//! Right-sizing reconciliation library
//!
//! This crate provides the core functionality for:
//! - Recording-rule generation from filter configuration
//! - Dependent resource lifecycle (upsert, best-effort cleanup)
//! - The per-component reconciliation state machine
//! - In-memory and Kubernetes resource stores
//! - Health checks and observability

pub mod component;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod reconcile;
pub mod rules;
pub mod store;

pub use component::{AddonApplier, ApplyChanges, ComponentConfig, ResourceNames};
pub use error::{Error, Result, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{RightSizingMetrics, StructuredLogger};
pub use reconcile::{reconcile, ComponentRuntime, Reconciler, Transition};
pub use store::{InMemoryStore, KubeStore, Resource, ResourceKey, ResourceKind, ResourceStore, StoreError};
