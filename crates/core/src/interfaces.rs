//! Abstract interfaces for the remote collaborators the scanner calls.

use crate::types::{FileEntry, Instance};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Base URL is missing for {0}")]
    MissingBaseUrl(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Orchestration panel: instance listing and suspension.
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// All instances known to the panel, suspended ones included.
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError>;

    async fn suspend(&self, instance_id: &str) -> Result<(), ApiError>;

    /// Manual reversal; never called by the automated scan path.
    async fn unsuspend(&self, instance_id: &str) -> Result<(), ApiError>;
}

/// Remote filesystem of a single instance.
#[async_trait]
pub trait FilesystemApi: Send + Sync {
    async fn list_files(&self, instance_id: &str, path: &str) -> Result<Vec<FileEntry>, ApiError>;
}

/// Alert delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, instance_id: &str, reason: &str) -> Result<(), ApiError>;
}
