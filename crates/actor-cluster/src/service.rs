//! # Clustering Service
//!
//! The [`ClusteringService`] owns every [`Cluster`] and drives the per-tick update.
//!
//! ## Tick fan-out
//!
//! [`ClusteringService::update_all`] is called once per external tick. It updates every
//! active cluster concurrently, and each cluster updates its running members concurrently.
//! A failing (or panicking) cluster update is caught and logged here; sibling clusters
//! finish their update regardless. The same isolation the actor loop applies to a single
//! bad message, applied one level up.
//!
//! ## Ownership
//!
//! Clusters are created and destroyed only through the service. Destroying a cluster stops
//! it, so any outstanding `Arc<Cluster>` handle becomes inert, but its member actors are not
//! touched: they belong to whoever created them.

use crate::actor::Actor;
use crate::cluster::Cluster;
use crate::error::ServiceError;
use crate::id::{ActorType, ClusterId};
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of one [`ClusteringService::update_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Clusters whose update completed without error.
    pub updated: usize,
    /// Clusters whose update failed or panicked.
    pub failed: usize,
    /// Registered clusters that were not active.
    pub skipped: usize,
}

pub struct ClusteringService {
    clusters: RwLock<HashMap<ClusterId, Arc<Cluster>>>,
    running: AtomicBool,
}

impl Default for ClusteringService {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusteringService {
    /// Creates a running service with no clusters.
    pub fn new() -> Self {
        Self {
            clusters: RwLock::new(HashMap::new()),
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start(&self) {
        if !self.running.swap(true, Ordering::AcqRel) {
            info!("Clustering service started");
        }
    }

    /// Stops ticking. Clusters stay registered and keep their state.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Clustering service stopped");
        }
    }

    /// Creates and starts a cluster for actors of `actor_type`.
    ///
    /// Fails if the service is stopped, or if `id` is nil or already taken.
    pub fn create_cluster(
        &self,
        id: ClusterId,
        name: impl Into<String>,
        actor_type: impl Into<ActorType>,
    ) -> Result<Arc<Cluster>, ServiceError> {
        if !self.is_running() {
            return Err(ServiceError::NotRunning);
        }
        if id.is_nil() {
            return Err(ServiceError::EmptyClusterId);
        }

        let mut clusters = self.clusters.write();
        if clusters.contains_key(&id) {
            return Err(ServiceError::ClusterExists(id));
        }
        let cluster = Arc::new(Cluster::new(id, name.into(), actor_type.into()));
        cluster.start();
        clusters.insert(id, cluster.clone());
        info!(cluster_id = %id, name = %cluster.name(), total = clusters.len(), "Cluster created");
        Ok(cluster)
    }

    /// Removes and stops the cluster. Returns whether it existed. Members are not stopped.
    pub fn destroy_cluster(&self, id: ClusterId) -> bool {
        let removed = self.clusters.write().remove(&id);
        match removed {
            Some(cluster) => {
                cluster.stop();
                info!(cluster_id = %id, "Cluster destroyed");
                true
            }
            None => false,
        }
    }

    pub fn get_cluster(&self, id: ClusterId) -> Option<Arc<Cluster>> {
        self.clusters.read().get(&id).cloned()
    }

    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clusters.read().keys().copied().collect()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.read().len()
    }

    /// Registers `actor` with the cluster `cluster_id`.
    pub fn register_actor(
        &self,
        cluster_id: ClusterId,
        actor: &Actor,
    ) -> Result<bool, ServiceError> {
        let cluster = self
            .get_cluster(cluster_id)
            .ok_or(ServiceError::ClusterNotFound(cluster_id))?;
        Ok(cluster.register(actor)?)
    }

    /// Sum of live members across all clusters. Observational only: nothing is swept.
    pub fn total_actor_count(&self) -> usize {
        self.clusters
            .read()
            .values()
            .map(|cluster| cluster.member_count())
            .sum()
    }

    /// Updates every active cluster concurrently.
    ///
    /// A no-op when the service is stopped or empty. Cluster failures are logged and
    /// counted in the summary; they never abort the pass.
    pub async fn update_all(&self, delta: Duration) -> UpdateSummary {
        self.update_all_with_cancel(delta, &CancellationToken::new())
            .await
    }

    /// [`update_all`](Self::update_all) that stops waiting on member updates once `cancel`
    /// fires. Clusters with cancelled members are counted as failed.
    pub async fn update_all_with_cancel(
        &self,
        delta: Duration,
        cancel: &CancellationToken,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        if !self.is_running() {
            return summary;
        }

        let (active, inactive): (Vec<Arc<Cluster>>, Vec<Arc<Cluster>>) = self
            .clusters
            .read()
            .values()
            .cloned()
            .partition(|cluster| cluster.is_active());
        summary.skipped = inactive.len();
        if active.is_empty() {
            return summary;
        }

        let results = futures::future::join_all(active.iter().map(|cluster| {
            AssertUnwindSafe(cluster.update_with_cancel(delta, cancel)).catch_unwind()
        }))
        .await;

        for (cluster, result) in active.iter().zip(results) {
            match result {
                Ok(Ok(report)) => {
                    summary.updated += 1;
                    debug!(
                        cluster_id = %cluster.id(),
                        updated = report.updated,
                        skipped = report.skipped,
                        "Cluster updated"
                    );
                }
                Ok(Err(e)) => {
                    summary.failed += 1;
                    error!(cluster_id = %cluster.id(), error = %e, "Cluster update failed");
                }
                Err(_) => {
                    summary.failed += 1;
                    error!(cluster_id = %cluster.id(), "Cluster update panicked");
                }
            }
        }

        debug!(
            updated = summary.updated,
            failed = summary.failed,
            skipped = summary.skipped,
            delta_ms = delta.as_millis() as u64,
            "Update pass complete"
        );
        summary
    }
}
