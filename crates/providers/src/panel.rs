use crate::http::{build_client, build_url, expect_ok, require_base_url, transport_error};
use async_trait::async_trait;
use reqwest::{Client, Url};
use sedar_core::{ApiError, Instance, PanelApi};
use std::time::Duration;
use tracing::{debug, warn};

/// Orchestration panel REST client.
pub struct PanelClient {
    client: Client,
    base_url: Option<String>,
    key: String,
}

impl PanelClient {
    pub fn new(base_url: Option<String>, key: String, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url,
            key,
        }
    }

    pub fn instances_url(&self) -> Result<Url, ApiError> {
        let base = require_base_url(&self.base_url, "panel")?;
        build_url(&format!("{}/api/instances", base), &[("key", self.key.as_str())])
    }

    pub fn suspend_url(&self, instance_id: &str) -> Result<Url, ApiError> {
        let base = require_base_url(&self.base_url, "panel")?;
        build_url(
            &format!("{}/api/instances/suspend", base),
            &[("key", self.key.as_str()), ("id", instance_id)],
        )
    }

    pub fn unsuspend_url(&self, instance_id: &str) -> Result<Url, ApiError> {
        let base = require_base_url(&self.base_url, "panel")?;
        build_url(
            &format!(
                "{}/api/instances/unsuspend/{}",
                base,
                urlencoding::encode(instance_id)
            ),
            &[("key", self.key.as_str())],
        )
    }
}

#[async_trait]
impl PanelApi for PanelClient {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError> {
        let url = self.instances_url()?;
        debug!("Listing instances from {}", url.path());

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        expect_ok(response.status())?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

        parse_instances(payload)
    }

    async fn suspend(&self, instance_id: &str) -> Result<(), ApiError> {
        let url = self.suspend_url(instance_id)?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        expect_ok(response.status())
    }

    async fn unsuspend(&self, instance_id: &str) -> Result<(), ApiError> {
        let url = self.unsuspend_url(instance_id)?;
        let response = self.client.post(url).send().await.map_err(transport_error)?;
        expect_ok(response.status())
    }
}

/// Decode the panel's instance array. Entries without a usable id are skipped.
pub fn parse_instances(payload: serde_json::Value) -> Result<Vec<Instance>, ApiError> {
    let serde_json::Value::Array(items) = payload else {
        return Err(ApiError::InvalidPayload(
            "expected an array of instances".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Instance>(item) {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!("Skipping malformed instance entry: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: Option<&str>) -> PanelClient {
        PanelClient::new(
            base.map(str::to_string),
            "s3cret".to_string(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_instances_url() {
        let url = client(Some("http://panel.local:3000/")).instances_url().unwrap();
        assert_eq!(url.as_str(), "http://panel.local:3000/api/instances?key=s3cret");
    }

    #[test]
    fn test_suspend_url() {
        let url = client(Some("http://panel.local")).suspend_url("abc-1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://panel.local/api/instances/suspend?key=s3cret&id=abc-1"
        );
    }

    #[test]
    fn test_unsuspend_url_encodes_id() {
        let url = client(Some("http://panel.local")).unsuspend_url("a b").unwrap();
        assert_eq!(
            url.as_str(),
            "http://panel.local/api/instances/unsuspend/a%20b?key=s3cret"
        );
    }

    #[tokio::test]
    async fn test_missing_base_url_is_not_a_request() {
        let panel = client(None);
        assert_eq!(
            panel.list_instances().await,
            Err(ApiError::MissingBaseUrl("panel"))
        );
        assert_eq!(
            panel.suspend("abc").await,
            Err(ApiError::MissingBaseUrl("panel"))
        );
        assert_eq!(
            panel.unsuspend("abc").await,
            Err(ApiError::MissingBaseUrl("panel"))
        );
    }

    #[test]
    fn test_parse_instances() {
        let instances = parse_instances(json!([
            {"Id": "a", "suspended": false, "Name": "survival"},
            {"Id": "b", "suspended": true},
            {"Name": "no id"},
            {"Id": 7}
        ]))
        .unwrap();

        assert_eq!(
            instances,
            vec![
                Instance::new("a", false),
                Instance::new("b", true),
                Instance::new("7", false),
            ]
        );
    }

    #[test]
    fn test_parse_instances_null_suspended_is_active() {
        let instances = parse_instances(json!([
            {"Id": "a", "suspended": null},
            {"Id": "b"}
        ]))
        .unwrap();

        assert_eq!(
            instances,
            vec![Instance::new("a", false), Instance::new("b", false)]
        );
    }

    #[test]
    fn test_parse_instances_rejects_non_array() {
        assert!(matches!(
            parse_instances(json!({"error": "unauthorized"})),
            Err(ApiError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_instances(serde_json::Value::Null),
            Err(ApiError::InvalidPayload(_))
        ));
    }
}
