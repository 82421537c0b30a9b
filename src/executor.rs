//! Single-request execution and response classification

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::AuthTokens;
use crate::wire::{AuthTokensResponse, ErrorResponse, RefreshTokenRequest};

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
pub const REFRESH_PATH: &str = "/v1/auth/refresh";

/// Description of one backend call, independent of the token it will carry
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub auth_required: bool,
    pub retry_on_unauthorized: bool,
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            auth_required: false,
            retry_on_unauthorized: true,
            body: None,
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.auth_required = true;
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// The same request, marked as the one permitted retry
    pub fn as_retry(&self) -> Self {
        Self {
            retry_on_unauthorized: false,
            ..self.clone()
        }
    }
}

/// Successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Body(Vec<u8>),
    NoContent,
}

impl Reply {
    pub fn decode<R: DeserializeOwned>(self) -> Result<R> {
        match self {
            Reply::Body(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Reply::NoContent => Err(ClientError::InvalidResponse(
                "expected a JSON body, got 204 No Content".to_string(),
            )),
        }
    }
}

/// Issues requests against the backend base URL
pub struct RequestExecutor<T> {
    transport: Arc<T>,
    base_url: Arc<str>,
}

impl<T> Clone for RequestExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: Arc::clone(&self.base_url),
        }
    }
}

impl<T: HttpTransport> RequestExecutor<T> {
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport: Arc::new(transport),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `spec`, presenting `bearer` when the request requires authentication
    ///
    /// Returns [`ClientError::Api`] for any non-2xx status, 401 included, and
    /// [`ClientError::Network`] when no response arrived.
    pub async fn send(&self, spec: &RequestSpec, bearer: Option<&str>) -> Result<Reply> {
        let request_id = Uuid::new_v4().to_string();
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            (REQUEST_ID_HEADER, request_id.clone()),
        ];
        if spec.auth_required {
            if let Some(token) = bearer {
                headers.push(("Authorization", format!("Bearer {token}")));
            }
        }

        let request = HttpRequest {
            method: spec.method.clone(),
            url: format!("{}{}", self.base_url, spec.path),
            headers,
            body: spec.body.clone(),
        };

        debug!(
            method = %spec.method,
            path = %spec.path,
            request_id = %request_id,
            retry = !spec.retry_on_unauthorized,
            "Sending request"
        );

        let response = self.transport.send(request).await?;
        classify(response)
    }

    /// Exchange a refresh token for a new token pair (unauthenticated)
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthTokens> {
        let spec = RequestSpec::new(Method::POST, REFRESH_PATH)
            .json(&RefreshTokenRequest { refresh_token })?;
        let payload: AuthTokensResponse = self.send(&spec, None).await?.decode()?;
        Ok(payload.into())
    }
}

fn classify(response: HttpResponse) -> Result<Reply> {
    if response.status == StatusCode::NO_CONTENT {
        return Ok(Reply::NoContent);
    }
    if response.status.is_success() {
        return Ok(Reply::Body(response.body));
    }
    Err(parse_error(&response).into())
}

/// Build the domain error for a rejected request
///
/// Falls back to a generic message when the body is not JSON or carries no usable `detail`.
pub fn parse_error(response: &HttpResponse) -> ApiError {
    let status_code = response.status.as_u16();
    let request_id = response.header(REQUEST_ID_HEADER).map(str::to_string);

    let detail = if response.is_json() {
        serde_json::from_slice::<ErrorResponse>(&response.body)
            .ok()
            .and_then(|payload| payload.message().map(str::to_string))
    } else {
        None
    };

    let message = detail.unwrap_or_else(|| format!("request failed with status {status_code}"));
    ApiError::new(status_code, message, request_id)
}
