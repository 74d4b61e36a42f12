use reqwest::{Client, StatusCode, Url};
use sedar_core::ApiError;
use std::time::Duration;

/// HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Configured base URL without trailing slashes, or `MissingBaseUrl`.
pub(crate) fn require_base_url<'a>(
    base_url: &'a Option<String>,
    component: &'static str,
) -> Result<&'a str, ApiError> {
    match base_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/')),
        _ => Err(ApiError::MissingBaseUrl(component)),
    }
}

pub(crate) fn build_url(raw: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
    Url::parse_with_params(raw, params).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
}

pub(crate) fn transport_error(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

/// The panel and filesystem APIs only count 200 as success.
pub(crate) fn expect_ok(status: StatusCode) -> Result<(), ApiError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ApiError::Status(status.as_u16()))
    }
}
