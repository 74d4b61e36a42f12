//! HTTP clients for the orchestration panel, the node filesystem daemon and
//! the Discord alert webhook.

pub mod discord;
pub mod filesystem;
pub mod http;
pub mod panel;

pub use discord::DiscordNotifier;
pub use filesystem::FilesystemClient;
pub use panel::PanelClient;
