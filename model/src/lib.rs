/*!

This library provides the in-memory data model shared by every component of the aggregation
engine: plugin definitions, the expected-result slot table, progress updates, the post-processed
result tree, run metadata, and the typed front for the JSON run configuration.

None of these types are Kubernetes custom resources. The workload manager (the in-cluster API
client) is an external collaborator here; this crate only describes the data that flows across
that boundary, not the boundary itself.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub mod config;
pub mod constants;
mod error;
pub mod plugin;
pub mod progress;
pub mod result_tree;
mod run_info;
pub mod slot;
pub mod tls;

pub use config::Config;
pub use error::{Error, Result};
pub use plugin::{ContainerSpec, Driver, PluginDefinition, ResultFormat};
pub use progress::ProgressUpdate;
pub use result_tree::ResultItem;
pub use run_info::RunInfo;
pub use slot::{ExpectedResult, NodeKey, ResultStatus, SlotKey, SlotStatus};
