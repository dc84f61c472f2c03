#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

//! Assembles a results directory into the final gzipped tar archive (SPEC_FULL.md §4.6), and
//! untars archives and worker submissions back out with the same path-safety rule on both sides.

mod assemble;
pub mod error;
mod extract;
mod path_safety;

pub use assemble::assemble;
pub use error::{Error, Result};
pub use extract::{extract_gzip_tar, extract_tar};
pub use path_safety::{is_safe_member_path, to_posix_member_name};
