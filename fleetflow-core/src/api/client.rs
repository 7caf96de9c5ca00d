//! HTTP client for the fleet backend's Location resource

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{LocationResource, LocationUpdate};

/// Source of the bearer token, consulted before every request.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Token store holding a fixed token (typically from config).
pub struct StaticTokenStore(pub Option<String>);

impl TokenStore for StaticTokenStore {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The one outbound call the reporter needs; a trait so tests can count
/// invocations without a server.
#[async_trait]
pub trait LocationUpdater: Send + Sync {
    /// `PATCH {base}/{id}` with `{latitude, longitude}`.
    async fn update_location(&self, id: &str, update: &LocationUpdate) -> Result<LocationResource>;
}

/// Response envelope the backend wraps every resource in.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for the Location resource.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client from configuration and a token source.
    ///
    /// Returns an error if the configuration is invalid or incomplete.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("api.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Create a client whose token comes from the config file.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(config, Arc::new(StaticTokenStore(config.token.clone())))
    }

    /// Fetch a Location by id.
    pub async fn get_location(&self, id: &str) -> Result<LocationResource> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(id));
        let request = self.authorize(self.http.get(&url));
        let response = request
            .send()
            .await
            .map_err(|e| Error::Api(format!("HTTP request failed: {}", e)))?;
        parse_envelope(response).await
    }

    /// Resolve the Location associated with a route.
    pub async fn get_location_from_route(&self, route: &str) -> Result<LocationResource> {
        let url = format!(
            "{}/getLocation/?route={}",
            self.base_url,
            urlencoding::encode(route)
        );
        let request = self.authorize(self.http.get(&url));
        let response = request
            .send()
            .await
            .map_err(|e| Error::Api(format!("HTTP request failed: {}", e)))?;
        parse_envelope(response).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl LocationUpdater for ApiClient {
    async fn update_location(&self, id: &str, update: &LocationUpdate) -> Result<LocationResource> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(id));
        let request = self.authorize(self.http.patch(&url)).json(update);
        let response = request
            .send()
            .await
            .map_err(|e| Error::Api(format!("HTTP request failed: {}", e)))?;
        parse_envelope(response).await
    }
}

/// Unwrap a `{data: T}` response, mapping non-2xx statuses to [`Error::Api`].
async fn parse_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("failed to parse response: {}", e)))?;
        Ok(envelope.data)
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(Error::Api(format!(
            "API error ({}): {}",
            status, error_text
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_base_url() {
        let config = ApiConfig::default();
        assert!(ApiClient::from_config(&config).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = ApiConfig {
            base_url: Some("https://fleet.example.com/api/v1/location".to_string()),
            token: Some("abc123".to_string()),
            ..Default::default()
        };
        assert!(ApiClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ApiConfig {
            base_url: Some("https://fleet.example.com/api/v1/location/".to_string()),
            ..Default::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://fleet.example.com/api/v1/location");
    }

    #[test]
    fn test_envelope_deserializes_backend_shape() {
        let json = r#"{"data": {"_id": "loc123", "latitude": 12.9, "longitude": 77.5, "user": "u1"}}"#;
        let envelope: Envelope<LocationResource> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.id, "loc123");
        assert_eq!(envelope.data.latitude, 12.9);
        assert_eq!(envelope.data.user.as_deref(), Some("u1"));
    }

    #[test]
    fn test_static_token_store() {
        let store = StaticTokenStore(Some("tok".to_string()));
        assert_eq!(store.token().as_deref(), Some("tok"));
        assert!(StaticTokenStore(None).token().is_none());
    }
}
