#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

//! Owns the lifecycle of one Sonobuoy run (SPEC_FULL.md §4.4): computes the expected-result set,
//! issues run certificates, starts the aggregation server, launches plugin workloads in order,
//! and runs the pod-liveness and per-plugin timeout watchdogs until every slot is terminal or the
//! run is cancelled.

mod controller;
pub mod error;
mod liveness;
pub mod state;
mod timeout;

pub use controller::{RunController, RunControllerConfig, RunHandle};
pub use error::{Error, Result};
pub use state::RunState;
