use anyhow::{bail, Context, Result};
use sedar_app::bootstrap::{self, Services};
use sedar_app::config::Config;
use sedar_core::{Sweep, SweepLoop};
use std::time::Duration;
use tracing::info;

const USAGE: &str = "Usage: sedar [once | unsuspend <id>]";

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let services = bootstrap::build_services(&config);

    match args.get(1).map(String::as_str) {
        None => run_daemon(&services, config.interval()).await,
        Some("once") => {
            let result = services.scanner.sweep().await;
            info!("Sweep finished: {}", result.summary());
            Ok(())
        }
        Some("unsuspend") => {
            let id = args.get(2).context(USAGE)?;
            services
                .panel
                .unsuspend(id)
                .await
                .with_context(|| format!("Failed to unsuspend server {}", id))?;
            info!("Server with ID: {} has been unsuspended.", id);
            Ok(())
        }
        Some(other) => bail!("Unknown command '{}'. {}", other, USAGE),
    }
}

async fn run_daemon(services: &Services, interval: Duration) -> Result<()> {
    info!("Sedar started, scanning every {}s", interval.as_secs());
    let mut sweep_loop = SweepLoop::new(services.scanner.clone(), interval);

    tokio::select! {
        _ = sweep_loop.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
        }
    }

    info!(
        "Shutting down after {} sweeps ({} failed)",
        sweep_loop.sweeps_completed(),
        sweep_loop.sweeps_failed()
    );
    Ok(())
}
