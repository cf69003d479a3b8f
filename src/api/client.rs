//! HTTP client for the product analytics endpoint.

use crate::error::FetchError;
use crate::models::AnalyticsResponse;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Anything that can produce the latest analytics for a product.
///
/// The poller only depends on this trait, so tests can script fetch outcomes
/// without a server.
pub trait AnalyticsSource: Send + Sync + 'static {
    fn fetch_latest(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<AnalyticsResponse, FetchError>> + Send;
}

/// Configuration for the analytics client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_seconds: u64,
}

/// Client for `GET {base}/products/{id}/analytics`.
pub struct AnalyticsClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl AnalyticsClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("brandpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn analytics_url(&self, product_id: &str) -> String {
        format!("{}/products/{}/analytics", self.base_url, product_id)
    }
}

impl AnalyticsSource for AnalyticsClient {
    async fn fetch_latest(&self, product_id: &str) -> Result<AnalyticsResponse, FetchError> {
        let url = self.analytics_url(product_id);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response.text().await?;
        decode_response(&body)
    }
}

/// Decode a response body, distinguishing a missing `analytics` array from
/// otherwise malformed JSON.
pub fn decode_response(body: &str) -> Result<AnalyticsResponse, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|source| FetchError::Deserialize { source })?;

    if !value.get("analytics").is_some_and(Value::is_array) {
        return Err(FetchError::MissingAnalytics);
    }

    serde_json::from_value(value).map_err(|source| FetchError::Deserialize { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisStatus;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AnalyticsClient {
        AnalyticsClient::new(ClientConfig {
            base_url: format!("{}/", base_url),
            token: "secret-token".to_string(),
            timeout_seconds: 5,
        })
        .expect("client construction should not fail")
    }

    #[tokio::test]
    async fn test_fetch_latest_sends_bearer_token() {
        let server = MockServer::start().await;

        let body = json!({
            "analytics": [
                { "id": "r2", "status": "completed", "date": "2025-05-02T00:00:00Z",
                  "analytics": { "brand_name": "Acme" } },
                { "id": "r1", "status": "completed", "date": "2025-05-01T00:00:00Z" }
            ],
            "count": 2,
            "limit": 10,
            "product_id": "p-42"
        });

        Mock::given(method("GET"))
            .and(path("/products/p-42/analytics"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = assert_ok!(client.fetch_latest("p-42").await);

        assert_eq!(response.count, 2);
        assert_eq!(response.product_id.as_deref(), Some("p-42"));
        assert_eq!(
            response.most_recent().and_then(|r| r.id.as_deref()),
            Some("r2")
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/products/p-1/analytics"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = assert_err!(client.fetch_latest("p-1").await);

        assert!(matches!(
            err,
            FetchError::Status { status: 503, ref body } if body == "maintenance"
        ));
    }

    #[tokio::test]
    async fn test_missing_analytics_array_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/products/p-1/analytics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "limit": 10 })),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = assert_err!(client.fetch_latest("p-1").await);
        assert!(matches!(err, FetchError::MissingAnalytics));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = test_client("http://127.0.0.1:1");
        let err = assert_err!(client.fetch_latest("p-1").await);
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[test]
    fn test_decode_response_rejects_garbage() {
        assert!(matches!(
            decode_response("<html>"),
            Err(FetchError::Deserialize { .. })
        ));
        assert!(matches!(
            decode_response(r#"{"analytics": "nope"}"#),
            Err(FetchError::MissingAnalytics)
        ));
        assert!(decode_response(r#"{"analytics": []}"#).is_ok());
    }

    #[test]
    fn test_decode_response_tolerates_loose_metadata() {
        let body = r#"{
            "analytics": [{ "id": 17, "product_id": 42, "status": "completed" }],
            "count": null,
            "limit": null,
            "product_id": 42
        }"#;

        let response = assert_ok!(decode_response(body));
        assert_eq!(response.count, 0);
        let record = response.most_recent().unwrap();
        assert_eq!(record.id.as_deref(), Some("17"));
        assert_eq!(record.product_id.as_deref(), Some("42"));
        assert_eq!(record.status(), AnalysisStatus::Completed);
    }

    #[test]
    fn test_analytics_url_strips_trailing_slash() {
        let client = test_client("https://api.example.com");
        assert_eq!(
            client.analytics_url("abc"),
            "https://api.example.com/products/abc/analytics"
        );
    }
}
