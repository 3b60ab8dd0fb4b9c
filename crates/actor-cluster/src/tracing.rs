//! # Observability & Tracing
//!
//! The core logs with `tracing` structured fields (`actor_id`, `cluster_id`, `message_id`,
//! `elapsed_ms`, ...). [`setup_tracing`] installs a compact subscriber for binaries and tests.
//!
//! ## Log levels
//!
//! - `info`: lifecycle transitions (initialized, started, stopped, disposed), cluster
//!   creation/destruction, joins and leaves.
//! - `debug`: per-message outcomes, broadcasts, update passes, swept members.
//! - `trace`: every send and every routed reply.
//! - `warn`: handler failures and isolated member update failures.
//! - `error`: cluster update failures caught by the clustering service.
//!
//! ```bash
//! RUST_LOG=info cargo run -p cluster-sample
//! RUST_LOG=actor_cluster=debug cargo test
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
