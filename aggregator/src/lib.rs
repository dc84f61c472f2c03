#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! The aggregation server (SPEC_FULL.md §4.3): an mTLS HTTP endpoint each launched plugin (and
//! its worker sidecar) calls back into to post progress and submit terminal results. The slot
//! table itself is owned by a single actor task (`owner`) reached only through `updater`; the
//! HTTP layer in `server` never touches it directly.

pub mod error;
pub mod owner;
pub mod server;
pub mod tls;
pub mod updater;

pub use error::{Error, Result};
pub use owner::SubmitOutcome;
pub use server::{router, serve};
pub use updater::{SlotReader, SlotUpdater};
