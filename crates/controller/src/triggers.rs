//! Reconciliation triggers and the single worker that serializes attempts

use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use rightsizing_lib::{ComponentIdentity, HealthRegistry, Options, Reconciler, ResourceNames};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capacity of the trigger queue; bursts beyond it wait on the sender
pub const TRIGGER_QUEUE_CAPACITY: usize = 16;

/// Why a reconciliation pass runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Resync,
    /// A configuration record was applied or deleted
    RecordChanged(String),
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Resync => "resync",
            Trigger::RecordChanged(_) => "record_changed",
        }
    }
}

/// Names of every component's configuration record
pub fn config_record_names() -> Vec<&'static str> {
    ComponentIdentity::ALL
        .iter()
        .map(|id| ResourceNames::for_identity(*id).config_record)
        .collect()
}

/// Send a resync trigger every `period`
pub async fn resync(period: Duration, tx: mpsc::Sender<Trigger>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; startup already covers it.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.send(Trigger::Resync).await.is_err() {
            break;
        }
    }
}

/// Watch the config namespace and trigger on configuration record changes
pub async fn watch_config_records(client: Client, namespace: String, tx: mpsc::Sender<Trigger>) {
    let names = config_record_names();
    let api: Api<ConfigMap> = Api::namespaced(client, &namespace);
    let mut events = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();

    info!(namespace = %namespace, records = ?names, "Watching configuration records");

    while let Some(event) = events.next().await {
        match event {
            Ok(watcher::Event::Applied(cm)) | Ok(watcher::Event::Deleted(cm)) => {
                let name = cm.name_any();
                if !names.iter().any(|n| *n == name) {
                    continue;
                }
                debug!(record = %name, "Configuration record changed");
                if tx.send(Trigger::RecordChanged(name)).await.is_err() {
                    break;
                }
            }
            Ok(watcher::Event::Restarted(_)) => {
                debug!(namespace = %namespace, "Configuration record watch restarted");
            }
            Err(e) => warn!(error = %e, "Configuration record watch failed, retrying"),
        }
    }
}

/// Run reconciliation passes until every trigger sender is dropped.
///
/// Queued triggers are coalesced into one pass. The controller reports
/// ready once the first pass has run.
pub async fn run_worker(
    mut reconciler: Reconciler,
    options: Options,
    health: HealthRegistry,
    mut rx: mpsc::Receiver<Trigger>,
) {
    while let Some(trigger) = rx.recv().await {
        let mut coalesced = 0usize;
        while rx.try_recv().is_ok() {
            coalesced += 1;
        }

        debug!(trigger = trigger.as_str(), coalesced, "Starting reconciliation pass");
        match reconciler.reconcile_all(&options).await {
            Ok(transitions) => debug!(
                trigger = trigger.as_str(),
                components = transitions.len(),
                "Reconciliation pass complete"
            ),
            Err(e) => warn!(
                trigger = trigger.as_str(),
                error = %e,
                "Reconciliation pass failed, waiting for next trigger"
            ),
        }

        health.set_ready(true).await;
    }

    info!("Trigger channel closed, worker stopping");
}
