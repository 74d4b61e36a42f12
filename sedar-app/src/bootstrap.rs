use crate::config::Config;
use sedar_core::{FleetScanner, PanelApi};
use sedar_providers::{DiscordNotifier, FilesystemClient, PanelClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `sedar=info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sedar=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Clients and scanner wired from one configuration.
pub struct Services {
    pub panel: Arc<dyn PanelApi>,
    pub scanner: Arc<FleetScanner>,
}

pub fn build_services(config: &Config) -> Services {
    let timeout = config.request_timeout();

    let panel: Arc<dyn PanelApi> = Arc::new(PanelClient::new(
        config.panel.url.clone(),
        config.panel.key.clone(),
        timeout,
    ));
    let filesystem = Arc::new(FilesystemClient::with_username(
        config.node.url.clone(),
        config.node.username.clone(),
        config.node.key.clone(),
        timeout,
    ));
    let notifier = Arc::new(DiscordNotifier::new(config.discord.webhook.clone(), timeout));

    let scanner = FleetScanner::new(
        Arc::clone(&panel),
        filesystem,
        notifier,
        config.scan_policy(),
    );

    Services {
        panel,
        scanner: Arc::new(scanner),
    }
}
