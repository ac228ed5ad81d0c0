//! In-memory resource store with failure injection

use super::{Resource, ResourceKey, ResourceKind, ResourceStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Store operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    error: StoreError,
    /// `None` fails every call
    remaining: Option<usize>,
}

/// DashMap-backed store for tests and offline rendering
#[derive(Debug, Default)]
pub struct InMemoryStore {
    resources: DashMap<(ResourceKind, ResourceKey), Resource>,
    failures: DashMap<(ResourceKind, StoreOp), InjectedFailure>,
    calls: DashMap<(ResourceKind, StoreOp), usize>,
    journal: Mutex<Vec<(StoreOp, ResourceKind, ResourceKey)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource without going through the store API
    pub fn insert(&self, resource: Resource) {
        self.resources
            .insert((resource.kind, resource.key.clone()), resource);
    }

    /// Snapshot of a stored resource
    pub fn snapshot(&self, kind: ResourceKind, key: &ResourceKey) -> Option<Resource> {
        self.resources
            .get(&(kind, key.clone()))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, kind: ResourceKind, key: &ResourceKey) -> bool {
        self.resources.contains_key(&(kind, key.clone()))
    }

    /// All stored resources of a kind, sorted by key
    pub fn list(&self, kind: ResourceKind) -> Vec<Resource> {
        let mut items: Vec<Resource> = self
            .resources
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        items
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Fail every `op` on `kind` with `error` until cleared
    pub fn fail_on(&self, kind: ResourceKind, op: StoreOp, error: StoreError) {
        self.failures.insert(
            (kind, op),
            InjectedFailure {
                error,
                remaining: None,
            },
        );
    }

    /// Fail the next `op` on `kind` with `error`
    pub fn fail_once(&self, kind: ResourceKind, op: StoreOp, error: StoreError) {
        self.failures.insert(
            (kind, op),
            InjectedFailure {
                error,
                remaining: Some(1),
            },
        );
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Number of `op` calls made against `kind`, including failed ones
    pub fn call_count(&self, kind: ResourceKind, op: StoreOp) -> usize {
        self.calls.get(&(kind, op)).map(|c| *c).unwrap_or(0)
    }

    /// Every call made through the store API, in order, including failed ones
    pub fn journal(&self) -> Vec<(StoreOp, ResourceKind, ResourceKey)> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn enter(&self, kind: ResourceKind, op: StoreOp, key: &ResourceKey) -> Result<(), StoreError> {
        *self.calls.entry((kind, op)).or_insert(0) += 1;
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((op, kind, key.clone()));

        let mut exhausted = false;
        let result = match self.failures.get_mut(&(kind, op)) {
            Some(mut failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                    exhausted = *remaining == 0;
                }
                debug!(kind = %kind, op = ?op, "Injected store failure");
                Err(failure.error.clone())
            }
            None => Ok(()),
        };

        if exhausted {
            self.failures.remove(&(kind, op));
        }
        result
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Resource, StoreError> {
        self.enter(kind, StoreOp::Get, key)?;
        self.snapshot(kind, key).ok_or(StoreError::NotFound)
    }

    async fn create(&self, resource: &Resource) -> Result<(), StoreError> {
        self.enter(resource.kind, StoreOp::Create, &resource.key)?;
        let id = (resource.kind, resource.key.clone());
        if self.resources.contains_key(&id) {
            return Err(StoreError::AlreadyExists);
        }
        self.resources.insert(id, resource.clone());
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<(), StoreError> {
        self.enter(resource.kind, StoreOp::Update, &resource.key)?;
        match self.resources.get_mut(&(resource.kind, resource.key.clone())) {
            Some(mut existing) => {
                *existing = resource.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, kind: ResourceKind, key: &ResourceKey) -> Result<(), StoreError> {
        self.enter(kind, StoreOp::Delete, key)?;
        self.resources
            .remove(&(kind, key.clone()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
