//! # Cluster Sample
//!
//! A small tick-driven simulation built on [`actor_cluster`].
//!
//! - **[model]**: payload types exchanged with workers.
//! - **[worker_actor]**: the [`WorkerBehavior`](worker_actor::WorkerBehavior) every worker runs.
//! - **[clients]**: typed request wrappers over raw actor handles.
//! - **[config]**: JSON configuration with defaults.
//! - **[lifecycle]**: the [`SimulationSystem`](lifecycle::SimulationSystem) orchestrator.

pub mod clients;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod worker_actor;
