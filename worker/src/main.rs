use log::error;
use std::process;
use worker::WorkerConfig;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("unable to read worker configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = worker::run(config).await {
        error!("worker failed: {}", e);
        process::exit(1);
    }
}
