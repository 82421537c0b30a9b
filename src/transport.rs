//! HTTP transport seam
//!
//! Everything above this module talks to the backend through [`HttpTransport`], so the
//! refresh protocol can be exercised against a scripted fake as well as a real server.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// A fully-built request, ready to put on the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response whose body has been read in full
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.contains("application/json"))
    }
}

/// Capability to exchange one request for one response
///
/// Implementations return [`ClientError::Network`] when no response was obtained, and
/// [`ClientError::Unexpected`] when the request could not be built at all.
pub trait HttpTransport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Transport backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                ClientError::Unexpected(format!("Invalid request: {e}"))
            } else {
                ClientError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, headers: Vec<(&'static str, String)>) -> HttpRequest {
        HttpRequest {
            method: Method::GET,
            url: url.to_string(),
            headers,
            body: None,
        }
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_not_a_network_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let bad_token = request(
            "http://127.0.0.1:1/v1/conversations",
            vec![("Authorization", "Bearer bad\ntoken".to_string())],
        );

        let err = transport.send(bad_token).await.unwrap_err();

        assert!(matches!(err, ClientError::Unexpected(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_network_error() {
        let transport = ReqwestTransport::from_client(Client::new());

        let err = transport
            .send(request("http://127.0.0.1:1/v1/conversations", Vec::new()))
            .await
            .unwrap_err();

        assert!(err.is_network());
    }

    #[test]
    fn test_json_content_type_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        let response = HttpResponse {
            status: StatusCode::OK,
            headers,
            body: Vec::new(),
        };

        assert!(response.is_json());
        assert_eq!(response.header("content-type"), Some("application/json; charset=utf-8"));
    }
}
