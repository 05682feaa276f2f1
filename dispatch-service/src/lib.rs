pub mod api;
pub mod checker;
pub mod clock;
pub mod config;
pub mod metrics_server;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod reconcile;
pub mod scheduler;
pub mod service;
pub mod sinks;
pub mod sources;
pub mod sync;
pub mod transform;

pub use pipeline::{Envelope, PipelineError};
