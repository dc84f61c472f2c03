/*!

Command line interface for launching and inspecting Kubernetes conformance-test runs.

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

mod delete;
mod k8s;
mod plugins;
mod results;
mod retrieve;
mod run;
mod status;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;

/// The command line interface for launching and inspecting conformance-test runs.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Launch a run and wait for it to finish.
    Run(run::Run),
    /// Print a snapshot of every slot's state from the most recent run.
    Status(status::Status),
    /// Fetch the archive produced by the most recent run.
    Retrieve(retrieve::Retrieve),
    /// Render the post-processed result trees inside an archive.
    Results(results::Results),
    /// Remove the in-cluster objects a run created.
    Delete(delete::Delete),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    let kubeconfig = args.kubeconfig;
    let outcome = match args.command {
        Command::Run(run) => run.run(kubeconfig).await,
        Command::Status(status) => status.run(),
        Command::Retrieve(retrieve) => retrieve.run().await,
        Command::Results(results) => results.run(),
        Command::Delete(delete) => delete.run(kubeconfig).await,
    };
    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(2);
        }
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .init();
        }
    }
}
