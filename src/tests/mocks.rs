//! Mock implementations for testing

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api_client::BackendApi;
use crate::error::{ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::*;

type Handler = Arc<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    delay: Option<Duration>,
    handler: Handler,
}

#[derive(Default)]
struct ScriptState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// Transport answering from scripted routes and recording every request
///
/// Requests to unscripted routes fail as network errors.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        self.push(method, path, None, Arc::new(handler));
    }

    pub fn respond(&self, method: Method, path: &str, response: HttpResponse) {
        self.push(method, path, None, Arc::new(move |_| Ok(response.clone())));
    }

    pub fn respond_after(&self, method: Method, path: &str, delay: Duration, response: HttpResponse) {
        self.push(method, path, Some(delay), Arc::new(move |_| Ok(response.clone())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && path_of(&request.url) == path)
            .count()
    }

    fn push(&self, method: Method, path: &str, delay: Option<Duration>, handler: Handler) {
        self.state.lock().unwrap().routes.push(Route {
            method,
            path: path.to_string(),
            delay,
            handler,
        });
    }
}

fn path_of(url: &str) -> String {
    Url::parse(url).map(|url| url.path().to_string()).unwrap_or_default()
}

impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let matched = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            let path = path_of(&request.url);
            state
                .routes
                .iter()
                .find(|route| route.method == request.method && route.path == path)
                .map(|route| (route.delay, Arc::clone(&route.handler)))
        };

        let Some((delay, handler)) = matched else {
            return Err(ClientError::Network(format!(
                "connection refused: {} {}",
                request.method, request.url
            )));
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        handler(&request)
    }
}

fn response(status: u16, content_type: &'static str, body: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.as_bytes().to_vec(),
    }
}

pub fn json_response(status: u16, body: &str) -> HttpResponse {
    response(status, "application/json", body)
}

pub fn text_response(status: u16, body: &str) -> HttpResponse {
    response(status, "text/plain", body)
}

pub fn tokens_body(access: &str, refresh: &str) -> String {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in_seconds": 1800,
        "token_type": "bearer"
    })
    .to_string()
}

pub fn token_pair(access: &str, refresh: &str) -> AuthTokens {
    AuthTokens {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in_seconds: 1800,
    }
}

/// Scripted result for a fake backend call
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Tokens(AuthTokens),
    Done,
    Api(u16),
    Network,
    Unexpected,
}

impl FakeOutcome {
    fn tokens(&self) -> Result<AuthTokens> {
        match self {
            FakeOutcome::Tokens(tokens) => Ok(tokens.clone()),
            other => Err(other.error()),
        }
    }

    fn unit(&self) -> Result<()> {
        match self {
            FakeOutcome::Done | FakeOutcome::Tokens(_) => Ok(()),
            other => Err(other.error()),
        }
    }

    fn error(&self) -> ClientError {
        match self {
            FakeOutcome::Api(status) => ClientError::api(*status, "rejected by fake backend"),
            FakeOutcome::Network => ClientError::Network("fake network down".to_string()),
            _ => ClientError::Unexpected("fake backend defect".to_string()),
        }
    }
}

/// In-process backend for use-case tests
pub struct FakeBackendApi {
    pub auth_outcome: Mutex<FakeOutcome>,
    pub refresh_outcome: Mutex<FakeOutcome>,
    pub logout_outcome: Mutex<FakeOutcome>,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub removed: Mutex<Vec<String>>,
}

impl FakeBackendApi {
    pub fn new() -> Self {
        Self {
            auth_outcome: Mutex::new(FakeOutcome::Tokens(token_pair("access-1", "refresh-1"))),
            refresh_outcome: Mutex::new(FakeOutcome::Tokens(token_pair("access-new", "refresh-new"))),
            logout_outcome: Mutex::new(FakeOutcome::Done),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_refresh(self, outcome: FakeOutcome) -> Self {
        *self.refresh_outcome.lock().unwrap() = outcome;
        self
    }

    pub fn with_logout(self, outcome: FakeOutcome) -> Self {
        *self.logout_outcome.lock().unwrap() = outcome;
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

impl BackendApi for FakeBackendApi {
    async fn register(&self, _input: &RegisterInput) -> Result<AuthTokens> {
        self.auth_outcome.lock().unwrap().tokens()
    }

    async fn login(&self, _input: &LoginInput) -> Result<AuthTokens> {
        self.auth_outcome.lock().unwrap().tokens()
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<AuthTokens> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_outcome.lock().unwrap().tokens()
    }

    async fn logout(&self, _refresh_token: &str) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_outcome.lock().unwrap().unit()
    }

    async fn get_system_prompt(&self) -> Result<SystemPrompt> {
        Ok(SystemPrompt {
            tenant_id: "tenant-1".to_string(),
            system_prompt: "Hola".to_string(),
        })
    }

    async fn update_system_prompt(&self, system_prompt: &str) -> Result<SystemPrompt> {
        Ok(SystemPrompt {
            tenant_id: "tenant-1".to_string(),
            system_prompt: system_prompt.to_string(),
        })
    }

    async fn create_embedded_signup_session(&self) -> Result<EmbeddedSignupSession> {
        Ok(EmbeddedSignupSession {
            state: "state-1".to_string(),
            connect_url: "https://facebook.test/dialog".to_string(),
        })
    }

    async fn get_whatsapp_connection(&self) -> Result<WhatsappConnection> {
        Ok(WhatsappConnection {
            tenant_id: "tenant-1".to_string(),
            status: WhatsappConnectionStatus::Disconnected,
            phone_number_id: None,
            business_account_id: None,
        })
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        Ok(vec![ConversationSummary {
            conversation_id: "conv-1".to_string(),
            whatsapp_user_id: "5491100000000".to_string(),
            last_message_preview: Some("hola".to_string()),
            updated_at: "2025-03-01T10:00:00Z".to_string(),
            control_mode: ControlMode::Ai,
        }])
    }

    async fn list_conversation_messages(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        Ok(vec![ConversationMessage {
            message_id: "msg-1".to_string(),
            conversation_id: conversation_id.to_string(),
            role: "user".to_string(),
            direction: "inbound".to_string(),
            content: "hola".to_string(),
            created_at: "2025-03-01T10:00:00Z".to_string(),
        }])
    }

    async fn update_conversation_control_mode(
        &self,
        _conversation_id: &str,
        control_mode: ControlMode,
    ) -> Result<ControlMode> {
        Ok(control_mode)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
        Ok(Vec::new())
    }

    async fn add_blacklist(&self, whatsapp_user_id: &str) -> Result<BlacklistEntry> {
        Ok(BlacklistEntry {
            tenant_id: "tenant-1".to_string(),
            whatsapp_user_id: whatsapp_user_id.to_string(),
            created_at: "2025-03-01T10:00:00Z".to_string(),
        })
    }

    async fn remove_blacklist(&self, whatsapp_user_id: &str) -> Result<()> {
        self.removed.lock().unwrap().push(whatsapp_user_id.to_string());
        Ok(())
    }
}
