use actor_cluster::tracing::setup_tracing;
use cluster_sample::config::SimulationConfig;
use cluster_sample::error::SampleError;
use cluster_sample::lifecycle::SimulationSystem;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), SampleError> {
    setup_tracing();

    let config = SimulationConfig::load(std::env::args_os().nth(1).map(PathBuf::from))?;
    info!(
        clusters = config.clusters.len(),
        ticks = config.ticks,
        "Starting simulation"
    );

    let system = SimulationSystem::new(config).await?;

    let report = system.announce("simulation starting")?;
    info!(delivered = report.delivered, failed = report.failures.len(), "Announcement sent");

    let answered = system.ping_all().await;
    info!(answered, workers = system.workers().len(), "Ping round complete");

    system.run().await;

    for status in system.statuses().await {
        info!(
            worker = %status.name,
            ticks = status.ticks,
            simulated_ms = status.simulated_ms,
            announcements = status.announcements,
            "Worker status"
        );
    }

    system.shutdown().await;
    Ok(())
}
