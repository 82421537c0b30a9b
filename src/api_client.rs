//! Authenticated backend client with transparent token refresh

use reqwest::Method;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::executor::{Reply, RequestExecutor, RequestSpec};
use crate::refresh::RefreshCoordinator;
use crate::token_store::TokenStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::*;
use crate::wire::*;

/// Backend operations consumed by the use-case layer
///
/// Implemented by [`ApiClient`] over HTTP and by fakes in tests.
pub trait BackendApi: Send + Sync + 'static {
    fn register(&self, input: &RegisterInput) -> impl Future<Output = Result<AuthTokens>> + Send;
    fn login(&self, input: &LoginInput) -> impl Future<Output = Result<AuthTokens>> + Send;
    fn refresh(&self, refresh_token: &str) -> impl Future<Output = Result<AuthTokens>> + Send;
    fn logout(&self, refresh_token: &str) -> impl Future<Output = Result<()>> + Send;

    fn get_system_prompt(&self) -> impl Future<Output = Result<SystemPrompt>> + Send;
    fn update_system_prompt(&self, system_prompt: &str) -> impl Future<Output = Result<SystemPrompt>> + Send;

    fn create_embedded_signup_session(&self) -> impl Future<Output = Result<EmbeddedSignupSession>> + Send;
    fn get_whatsapp_connection(&self) -> impl Future<Output = Result<WhatsappConnection>> + Send;

    fn list_conversations(&self) -> impl Future<Output = Result<Vec<ConversationSummary>>> + Send;
    fn list_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<ConversationMessage>>> + Send;
    fn update_conversation_control_mode(
        &self,
        conversation_id: &str,
        control_mode: ControlMode,
    ) -> impl Future<Output = Result<ControlMode>> + Send;

    fn list_blacklist(&self) -> impl Future<Output = Result<Vec<BlacklistEntry>>> + Send;
    fn add_blacklist(&self, whatsapp_user_id: &str) -> impl Future<Output = Result<BlacklistEntry>> + Send;
    fn remove_blacklist(&self, whatsapp_user_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP implementation of [`BackendApi`]
///
/// Requests carry the store's access token. A first 401 on an authenticated request
/// triggers one shared refresh and exactly one retry.
pub struct ApiClient<T = ReqwestTransport> {
    executor: RequestExecutor<T>,
    coordinator: RefreshCoordinator<T>,
    store: TokenStore,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, base_url: &str, store: TokenStore, refresh_timeout: Duration) -> Self {
        let executor = RequestExecutor::new(transport, base_url);
        let coordinator = RefreshCoordinator::new(executor.clone(), store.clone(), refresh_timeout);

        Self {
            executor,
            coordinator,
            store,
        }
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator<T> {
        &self.coordinator
    }

    /// Full request lifecycle: send, refresh once on 401, retry once
    pub async fn execute(&self, spec: RequestSpec) -> Result<Reply> {
        let presented = if spec.auth_required {
            self.store.access_token()
        } else {
            None
        };

        match self.executor.send(&spec, presented.as_deref()).await {
            Err(err) if err.is_unauthorized() && spec.auth_required && spec.retry_on_unauthorized => {
                debug!(path = %spec.path, "Access token rejected, attempting refresh");

                let Some(token) = self
                    .coordinator
                    .refresh_access_token(presented.as_deref())
                    .await?
                else {
                    info!(path = %spec.path, "No access token after refresh, giving up");
                    return Err(ApiError::token_expired().into());
                };

                debug!(path = %spec.path, "Retrying with refreshed access token");
                self.executor.send(&spec.as_retry(), Some(&token)).await
            }
            other => other,
        }
    }

    async fn fetch<R: DeserializeOwned>(&self, spec: RequestSpec) -> Result<R> {
        self.execute(spec).await?.decode()
    }

    async fn fetch_empty(&self, spec: RequestSpec) -> Result<()> {
        self.execute(spec).await.map(|_| ())
    }
}

fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

impl<T: HttpTransport> BackendApi for ApiClient<T> {
    async fn register(&self, input: &RegisterInput) -> Result<AuthTokens> {
        let spec = RequestSpec::new(Method::POST, "/v1/auth/register").json(&RegisterRequest {
            tenant_name: &input.tenant_name,
            email: &input.email,
            password: &input.password,
        })?;
        let payload: AuthTokensResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn login(&self, input: &LoginInput) -> Result<AuthTokens> {
        let spec = RequestSpec::new(Method::POST, "/v1/auth/login").json(&LoginRequest {
            email: &input.email,
            password: &input.password,
        })?;
        let payload: AuthTokensResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        self.coordinator.refresh_session(refresh_token).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<()> {
        let spec = RequestSpec::new(Method::POST, "/v1/auth/logout")
            .authenticated()
            .json(&RefreshTokenRequest { refresh_token })?;
        self.fetch_empty(spec).await
    }

    async fn get_system_prompt(&self) -> Result<SystemPrompt> {
        let spec = RequestSpec::new(Method::GET, "/v1/agent/system-prompt").authenticated();
        let payload: SystemPromptResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn update_system_prompt(&self, system_prompt: &str) -> Result<SystemPrompt> {
        let spec = RequestSpec::new(Method::PUT, "/v1/agent/system-prompt")
            .authenticated()
            .json(&UpdateSystemPromptRequest { system_prompt })?;
        let payload: SystemPromptResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn create_embedded_signup_session(&self) -> Result<EmbeddedSignupSession> {
        let spec = RequestSpec::new(Method::POST, "/v1/whatsapp/embedded-signup/session").authenticated();
        let payload: EmbeddedSignupSessionResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn get_whatsapp_connection(&self) -> Result<WhatsappConnection> {
        let spec = RequestSpec::new(Method::GET, "/v1/whatsapp/connection").authenticated();
        let payload: WhatsappConnectionResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let spec = RequestSpec::new(Method::GET, "/v1/conversations").authenticated();
        let payload: ItemList<ConversationSummaryResponse> = self.fetch(spec).await?;
        Ok(payload.into_domain())
    }

    async fn list_conversation_messages(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        let path = format!("/v1/conversations/{}/messages", segment(conversation_id));
        let spec = RequestSpec::new(Method::GET, path).authenticated();
        let payload: ItemList<MessageResponse> = self.fetch(spec).await?;
        Ok(payload.into_domain())
    }

    async fn update_conversation_control_mode(
        &self,
        conversation_id: &str,
        control_mode: ControlMode,
    ) -> Result<ControlMode> {
        let path = format!("/v1/conversations/{}/control-mode", segment(conversation_id));
        let spec = RequestSpec::new(Method::PUT, path)
            .authenticated()
            .json(&UpdateControlModeRequest { control_mode })?;
        let payload: ControlModeResponse = self.fetch(spec).await?;
        Ok(payload.control_mode)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
        let spec = RequestSpec::new(Method::GET, "/v1/blacklist").authenticated();
        let payload: ItemList<BlacklistEntryResponse> = self.fetch(spec).await?;
        Ok(payload.into_domain())
    }

    async fn add_blacklist(&self, whatsapp_user_id: &str) -> Result<BlacklistEntry> {
        let spec = RequestSpec::new(Method::POST, "/v1/blacklist")
            .authenticated()
            .json(&AddBlacklistRequest { whatsapp_user_id })?;
        let payload: BlacklistEntryResponse = self.fetch(spec).await?;
        Ok(payload.into())
    }

    async fn remove_blacklist(&self, whatsapp_user_id: &str) -> Result<()> {
        let path = format!("/v1/blacklist/{}", segment(whatsapp_user_id));
        let spec = RequestSpec::new(Method::DELETE, path).authenticated();
        self.fetch_empty(spec).await
    }
}
