// src/main.rs

use chatline::config::load_config;
use chatline::logging::init_logging;
use chatline::ui;
use dotenv::dotenv;
use log::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = load_config()?;
    // The handle flushes and closes the log file when dropped.
    let _logger = init_logging(&config)?;
    info!("starting chatline against {}", config.server_url);

    if let Err(e) = ui::run(config).await {
        error!("chatline exited with error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
