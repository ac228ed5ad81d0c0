//! Per-component reconciliation state machine
//!
//! One attempt runs per external trigger. Attempts for the same component
//! must be serialized by the caller; `&mut ComponentState` enforces this
//! within a process.

use crate::component::ComponentConfig;
use crate::error::{Error, Result};
use crate::health::HealthRegistry;
use crate::lifecycle::{cleanup_component, with_visibility_labels};
use crate::models::{ComponentIdentity, ComponentState, ConfigRecord, Options};
use crate::observability::{RightSizingMetrics, StructuredLogger};
use crate::store::{Resource, ResourceKey, ResourceKind, ResourceStore, StoreError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a successful attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Component is off; its resources were cleaned up
    Disabled,
    /// First enable since start or since the last disable
    Activated,
    /// Already enabled, moved from `previous` to a new binding
    Rebound { previous: String },
    /// Already enabled on the same binding; resources re-applied
    Refreshed,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Disabled => "disabled",
            Transition::Activated => "activated",
            Transition::Rebound { .. } => "rebound",
            Transition::Refreshed => "refreshed",
        }
    }
}

/// Run one reconciliation attempt for a component.
///
/// State is committed before any enable-side effect, so a failure leaves
/// `state` pointing at the binding the next attempt should clean up.
pub async fn reconcile(
    store: &dyn ResourceStore,
    options: &Options,
    config: &ComponentConfig,
    state: &mut ComponentState,
) -> Result<Transition> {
    let (enabled, binding) = options.desired(config.identity);
    let binding = if binding.is_empty() {
        config.default_namespace.clone()
    } else {
        binding.to_string()
    };

    if !enabled {
        debug!(component = %config.identity, namespace = %state.bound_namespace, "Component disabled");
        cleanup_component(store, config, &state.bound_namespace, &options.config_namespace, false).await;
        state.bound_namespace = binding;
        state.enabled = false;
        return Ok(Transition::Disabled);
    }

    let first_enable = !state.enabled;
    let rebind = state.enabled && state.bound_namespace != binding;
    let previous = std::mem::replace(&mut state.bound_namespace, binding.clone());
    state.enabled = true;

    if rebind {
        info!(
            component = %config.identity,
            from = %previous,
            to = %binding,
            "Binding changed, cleaning up previous namespace"
        );
        cleanup_component(store, config, &previous, &options.config_namespace, true).await;
    }

    ensure_config_record(store, config, &options.config_namespace).await?;
    let record = fetch_config_record(store, config, &options.config_namespace).await?;
    config.applier.apply(&record, &binding).await?;

    Ok(if first_enable {
        Transition::Activated
    } else if rebind {
        Transition::Rebound { previous }
    } else {
        Transition::Refreshed
    })
}

fn config_record_key(config: &ComponentConfig, config_namespace: &str) -> ResourceKey {
    ResourceKey::namespaced(config.names.config_record, config_namespace)
}

/// Seed the configuration record if absent. An existing record is never
/// overwritten.
pub async fn ensure_config_record(
    store: &dyn ResourceStore,
    config: &ComponentConfig,
    config_namespace: &str,
) -> Result<()> {
    let key = config_record_key(config, config_namespace);
    let target = format!("{} {}", ResourceKind::ConfigRecord, key);

    match store.get(ResourceKind::ConfigRecord, &key).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => {
            let data = (config.default_config)()?;
            let record = with_visibility_labels(Resource::config_record(key.clone(), &data), config.identity);
            match store.create(&record).await {
                Ok(()) => {
                    info!(component = %config.identity, name = %key, "Seeded configuration record with defaults");
                    Ok(())
                }
                Err(StoreError::AlreadyExists) => Ok(()),
                Err(e) => Err(Error::store("create", target, e)),
            }
        }
        Err(e) => Err(Error::store("get", target, e)),
    }
}

async fn fetch_config_record(
    store: &dyn ResourceStore,
    config: &ComponentConfig,
    config_namespace: &str,
) -> Result<ConfigRecord> {
    let key = config_record_key(config, config_namespace);
    let resource = store
        .get(ResourceKind::ConfigRecord, &key)
        .await
        .map_err(|e| Error::store("get", format!("{} {}", ResourceKind::ConfigRecord, key), e))?;
    ConfigRecord::from_data(&key.to_string(), &resource.data())
}

/// A component's static config and the state carried between attempts
#[derive(Debug, Clone)]
pub struct ComponentRuntime {
    pub config: ComponentConfig,
    pub state: ComponentState,
}

impl ComponentRuntime {
    pub fn new(config: ComponentConfig) -> Self {
        let state = ComponentState::new(config.default_namespace.clone());
        Self { config, state }
    }
}

/// Owns both component runtimes and drives them against one store
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    runtimes: Vec<ComponentRuntime>,
    metrics: RightSizingMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl Reconciler {
    /// Reconciler with the standard namespace and virtualization components
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        let configs = ComponentIdentity::ALL
            .iter()
            .map(|id| ComponentConfig::for_identity(*id, store.clone()))
            .collect();
        Self::with_components(store, configs)
    }

    /// Reconciler over explicit component configs, run in the given order
    pub fn with_components(store: Arc<dyn ResourceStore>, configs: Vec<ComponentConfig>) -> Self {
        Self {
            store,
            runtimes: configs.into_iter().map(ComponentRuntime::new).collect(),
            metrics: RightSizingMetrics::new(),
            logger: StructuredLogger::new("rightsizing-controller"),
            health: None,
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Current state of a component
    pub fn state(&self, identity: ComponentIdentity) -> Option<&ComponentState> {
        self.runtimes
            .iter()
            .find(|rt| rt.config.identity == identity)
            .map(|rt| &rt.state)
    }

    pub fn components(&self) -> impl Iterator<Item = ComponentIdentity> + '_ {
        self.runtimes.iter().map(|rt| rt.config.identity)
    }

    /// Reconcile every component in order.
    ///
    /// A failing component does not stop the others; the first error is
    /// returned after all have run.
    pub async fn reconcile_all(&mut self, options: &Options) -> Result<Vec<(ComponentIdentity, Transition)>> {
        let identities: Vec<ComponentIdentity> = self.components().collect();
        let mut transitions = Vec::with_capacity(identities.len());
        let mut first_error = None;

        for identity in identities {
            match self.reconcile_component(options, identity).await {
                Ok(transition) => transitions.push((identity, transition)),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(transitions),
        }
    }

    /// Reconcile a single component
    pub async fn reconcile_component(
        &mut self,
        options: &Options,
        identity: ComponentIdentity,
    ) -> Result<Transition> {
        let runtime = self
            .runtimes
            .iter_mut()
            .find(|rt| rt.config.identity == identity)
            .ok_or_else(|| Error::UnknownComponent(identity.to_string()))?;

        let start = Instant::now();
        let result = reconcile(self.store.as_ref(), options, &runtime.config, &mut runtime.state).await;
        self.metrics
            .observe_reconcile_latency(identity.as_str(), start.elapsed().as_secs_f64());
        self.metrics
            .set_component_enabled(identity.as_str(), runtime.state.enabled);

        match &result {
            Ok(transition) => {
                self.metrics
                    .inc_reconciliations(identity.as_str(), transition.as_str());
                self.logger
                    .log_transition(identity.as_str(), &runtime.state.bound_namespace, transition);
            }
            Err(e) => {
                let outcome = if e.is_validation() { "invalid" } else { "error" };
                self.metrics.inc_reconciliations(identity.as_str(), outcome);
                warn!(component = %identity, error = %e, "Reconciliation attempt failed");
            }
        }

        if let Some(health) = &self.health {
            health.record_attempt(identity.as_str(), &result).await;
        }

        result.map_err(|e| e.in_component(identity))
    }

    /// Full cleanup of every component at its current binding
    pub async fn cleanup_all(&self, config_namespace: &str) {
        for runtime in &self.runtimes {
            cleanup_component(
                self.store.as_ref(),
                &runtime.config,
                &runtime.state.bound_namespace,
                config_namespace,
                false,
            )
            .await;
        }
        info!("All right-sizing resources cleaned up");
    }
}
