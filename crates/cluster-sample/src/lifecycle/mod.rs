//! # Simulation Lifecycle
//!
//! [`SimulationSystem`] is the conductor of the sample: it builds the
//! [`ClusteringService`], creates one cluster per [`ClusterLayout`](crate::config::ClusterLayout),
//! spawns and registers the worker actors, drives the tick loop, and tears everything down.
//!
//! ## Shutdown
//!
//! 1. Stop the service so no further update pass starts.
//! 2. Dispose every worker. Outstanding requests resolve to `None`, queued messages are dropped.
//! 3. Destroy the clusters. Their membership is already empty by then.

use crate::clients::WorkerClient;
use crate::config::SimulationConfig;
use crate::error::SampleError;
use crate::model::{Announcement, WorkerStatus};
use crate::worker_actor::WorkerBehavior;
use actor_cluster::{
    Actor, BroadcastReport, ClusterId, ClusteringService, MembershipChange, Message, UpdateSummary,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of [`SimulationSystem::run`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u32,
    pub cluster_updates: usize,
    pub cluster_failures: usize,
}

pub struct SimulationSystem {
    config: SimulationConfig,
    service: Arc<ClusteringService>,
    clusters: Vec<ClusterId>,
    workers: Vec<WorkerClient>,
}

impl SimulationSystem {
    /// Creates the service, every configured cluster and its workers, all running.
    pub async fn new(config: SimulationConfig) -> Result<Self, SampleError> {
        let service = Arc::new(ClusteringService::new());
        let mut clusters = Vec::with_capacity(config.clusters.len());
        let mut workers = Vec::new();

        for layout in &config.clusters {
            let cluster_id = ClusterId::new();
            let cluster = service.create_cluster(
                cluster_id,
                layout.name.clone(),
                layout.actor_type.as_str(),
            )?;
            cluster.membership_events().subscribe(|event| {
                if event.change == MembershipChange::Left {
                    info!(
                        cluster_id = %event.cluster_id,
                        actor_id = %event.actor_id,
                        "Worker left"
                    );
                }
            });
            clusters.push(cluster_id);

            for index in 0..layout.actors {
                let name = format!("{}-{}", layout.name, index);
                let actor = Actor::new(WorkerBehavior::new(layout.actor_type.as_str(), name));
                actor.initialize().await?;
                actor.start().await?;
                service.register_actor(cluster_id, &actor)?;
                workers.push(WorkerClient::new(actor, config.request_timeout()));
            }
        }

        info!(
            clusters = clusters.len(),
            workers = workers.len(),
            "Simulation system ready"
        );
        Ok(Self {
            config,
            service,
            clusters,
            workers,
        })
    }

    pub fn service(&self) -> &Arc<ClusteringService> {
        &self.service
    }

    pub fn cluster_ids(&self) -> &[ClusterId] {
        &self.clusters
    }

    pub fn workers(&self) -> &[WorkerClient] {
        &self.workers
    }

    /// Runs the configured number of ticks, one [`ClusteringService::update_all`] per tick.
    #[instrument(skip(self), fields(ticks = self.config.ticks))]
    pub async fn run(&self) -> RunReport {
        let delta = self.config.tick_interval();
        let mut interval = tokio::time::interval(delta);
        let mut report = RunReport::default();

        for _ in 0..self.config.ticks {
            interval.tick().await;
            let UpdateSummary { updated, failed, .. } = self.service.update_all(delta).await;
            report.ticks += 1;
            report.cluster_updates += updated;
            report.cluster_failures += failed;
        }

        info!(
            ticks = report.ticks,
            updates = report.cluster_updates,
            failures = report.cluster_failures,
            "Simulation finished"
        );
        report
    }

    /// Broadcasts an [`Announcement`] to every member of every cluster.
    pub fn announce(&self, text: &str) -> Result<BroadcastReport, SampleError> {
        let mut total = BroadcastReport::default();
        for id in &self.clusters {
            let Some(cluster) = self.service.get_cluster(*id) else {
                continue;
            };
            let report = cluster.broadcast(&Message::new(Announcement(text.to_string())), None)?;
            total.delivered += report.delivered;
            total.failures.extend(report.failures);
        }
        Ok(total)
    }

    /// Pings every worker once. Returns how many answered within the timeout.
    pub async fn ping_all(&self) -> usize {
        let mut answered = 0;
        for (seq, worker) in self.workers.iter().enumerate() {
            match worker.ping(seq as u64).await {
                Ok(Some(pong)) if pong == seq as u64 => answered += 1,
                Ok(_) => warn!(actor_id = %worker.id(), "Ping unanswered"),
                Err(e) => warn!(actor_id = %worker.id(), error = %e, "Ping failed"),
            }
        }
        answered
    }

    /// Status of every worker that answered.
    pub async fn statuses(&self) -> Vec<WorkerStatus> {
        let mut statuses = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            if let Ok(Some(status)) = worker.status().await {
                statuses.push(status);
            }
        }
        statuses
    }

    pub async fn shutdown(self) {
        info!("Shutting down simulation");
        self.service.stop();

        for worker in &self.workers {
            worker.actor().dispose().await;
        }
        for id in &self.clusters {
            if let Some(cluster) = self.service.get_cluster(*id) {
                cluster.sweep();
            }
            self.service.destroy_cluster(*id);
        }
        info!("Simulation shut down");
    }
}
