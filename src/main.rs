use std::sync::Arc;

use photondam::config::{load_config, print_schema};
use photondam::startup::{credentials_from_env, run};
use photondam::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--print-schema") {
        if let Err(e) = print_schema() {
            eprintln!("Could not print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Could not initialise logging: {}", e);
        std::process::exit(1);
    }

    let credentials = match credentials_from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(Arc::new(config), credentials).await {
        error!("Session check failed: {}", e);
        std::process::exit(1);
    }
}
