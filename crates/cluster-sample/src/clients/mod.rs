//! Typed wrappers around raw actor handles.

pub mod worker_client;

pub use worker_client::WorkerClient;
