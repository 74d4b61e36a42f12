use crate::http::{build_client, build_url, expect_ok, require_base_url, transport_error};
use async_trait::async_trait;
use reqwest::{Client, Url};
use sedar_core::{ApiError, FileEntry, FilesystemApi};
use std::time::Duration;
use tracing::{debug, warn};

/// Basic-auth user the node daemon expects.
pub const DEFAULT_USERNAME: &str = "Skyport";

/// Remote filesystem client for the node daemon.
pub struct FilesystemClient {
    client: Client,
    base_url: Option<String>,
    username: String,
    key: String,
}

impl FilesystemClient {
    pub fn new(base_url: Option<String>, key: String, timeout: Duration) -> Self {
        Self::with_username(base_url, DEFAULT_USERNAME.to_string(), key, timeout)
    }

    pub fn with_username(
        base_url: Option<String>,
        username: String,
        key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_client(timeout),
            base_url,
            username,
            key,
        }
    }

    pub fn files_url(&self, instance_id: &str, path: &str) -> Result<Url, ApiError> {
        let base = require_base_url(&self.base_url, "node")?;
        build_url(
            &format!("{}/fs/{}/files", base, urlencoding::encode(instance_id)),
            &[("path", path)],
        )
    }
}

#[async_trait]
impl FilesystemApi for FilesystemClient {
    async fn list_files(&self, instance_id: &str, path: &str) -> Result<Vec<FileEntry>, ApiError> {
        let url = self.files_url(instance_id, path)?;
        debug!("Listing files for instance {} at '{}'", instance_id, path);

        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.key))
            .send()
            .await
            .map_err(transport_error)?;
        expect_ok(response.status())?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

        parse_listing(payload)
    }
}

/// Extract the `files` array from a listing response.
///
/// A missing or non-array `files` field fails the whole listing; a single
/// malformed entry is logged and skipped.
pub fn parse_listing(payload: serde_json::Value) -> Result<Vec<FileEntry>, ApiError> {
    let files = match payload {
        serde_json::Value::Object(mut map) => map.remove("files"),
        _ => None,
    };

    let Some(serde_json::Value::Array(items)) = files else {
        return Err(ApiError::InvalidPayload(
            "the \"files\" field is missing or not an array".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FileEntry>(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed file entry: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sedar_core::FilePurpose;
    use serde_json::json;

    #[test]
    fn test_files_url() {
        let client = FilesystemClient::new(
            Some("https://node1.example.com".to_string()),
            "nodekey".to_string(),
            Duration::from_secs(5),
        );

        let root = client.files_url("abc", "").unwrap();
        assert_eq!(root.as_str(), "https://node1.example.com/fs/abc/files?path=");

        let nested = client.files_url("abc", "plugins/My Plugin").unwrap();
        assert_eq!(
            nested.as_str(),
            "https://node1.example.com/fs/abc/files?path=plugins%2FMy+Plugin"
        );
    }

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(json!({
            "files": [
                {"name": "plugins", "extension": "", "purpose": "other",
                 "isDirectory": true, "isEditable": false, "size": "4KB"},
                {"name": "start.sh", "extension": ".sh", "purpose": "script",
                 "isDirectory": false, "isEditable": true, "size": "120B"},
                {"extension": ".txt"}
            ]
        }))
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].should_descend());
        assert_eq!(entries[1].purpose, FilePurpose::Script);
    }

    #[test]
    fn test_parse_listing_tolerates_null_fields() {
        let entries = parse_listing(json!({
            "files": [
                {"name": "xmrig", "extension": null, "purpose": "binary",
                 "isDirectory": false, "isEditable": false, "size": "6MB"},
                {"name": "xmrig", "extension": "", "purpose": "binary",
                 "isDirectory": false, "isEditable": false, "size": null},
                {"name": "plugins", "extension": "", "purpose": null,
                 "isDirectory": true, "isEditable": false, "size": "4KB"}
            ]
        }))
        .unwrap();

        assert_eq!(entries.len(), 3);
        for miner in &entries[..2] {
            assert_eq!(
                sedar_core::classify(miner).unwrap(),
                Some(sedar_core::Rule::MoneroMiner)
            );
        }
        assert_eq!(entries[2].purpose, FilePurpose::Other);
        assert!(entries[2].should_descend());
    }

    #[test]
    fn test_parse_listing_rejects_missing_files() {
        for payload in [
            json!({}),
            json!({"files": "nope"}),
            json!({"files": null}),
            json!([{"name": "a"}]),
        ] {
            assert!(matches!(
                parse_listing(payload),
                Err(ApiError::InvalidPayload(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_base_url() {
        let client = FilesystemClient::new(None, "k".to_string(), Duration::from_secs(1));
        assert_eq!(
            client.list_files("abc", "").await,
            Err(ApiError::MissingBaseUrl("node"))
        );
    }
}
