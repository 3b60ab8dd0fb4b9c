use actor_cluster::{ActorError, ClusterError, ServiceError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}
