//! Wiring of the client stack from configuration

use std::sync::Arc;
use tracing::info;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::persistence::FilePersistence;
use crate::token_store::TokenStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::use_cases::*;

/// Everything the rendering layer needs, sharing one client and one token store
pub struct AppContainer<T: HttpTransport = ReqwestTransport> {
    pub store: TokenStore,
    pub api: Arc<ApiClient<T>>,
    pub auth: AuthUseCase<ApiClient<T>>,
    pub onboarding: WhatsappOnboardingUseCase<ApiClient<T>>,
    pub conversations: ConversationUseCase<ApiClient<T>>,
    pub blacklist: BlacklistUseCase<ApiClient<T>>,
    pub agent: AgentUseCase<ApiClient<T>>,
}

impl AppContainer<ReqwestTransport> {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let store = match &config.refresh_token_path {
            Some(path) => TokenStore::new(FilePersistence::new(path)),
            None => TokenStore::in_memory(),
        };
        let transport = ReqwestTransport::new(config.request_timeout())?;

        info!(
            api_base_url = %config.api_base_url,
            persistent_session = config.refresh_token_path.is_some(),
            "Console client configured"
        );

        Ok(Self::with_transport(transport, config, store))
    }
}

impl<T: HttpTransport> AppContainer<T> {
    pub fn with_transport(transport: T, config: &ClientConfig, store: TokenStore) -> Self {
        let api = Arc::new(ApiClient::new(
            transport,
            config.api_base_url.trim(),
            store.clone(),
            config.refresh_timeout(),
        ));

        Self {
            auth: AuthUseCase::new(Arc::clone(&api), store.clone()),
            onboarding: WhatsappOnboardingUseCase::new(Arc::clone(&api)),
            conversations: ConversationUseCase::new(Arc::clone(&api)),
            blacklist: BlacklistUseCase::new(Arc::clone(&api)),
            agent: AgentUseCase::new(Arc::clone(&api)),
            api,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{json_response, tokens_body, ScriptedTransport};
    use crate::types::{LoginInput, SessionStatus};
    use reqwest::Method;

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(AppContainer::new(&ClientConfig::new("")).is_err());
    }

    #[tokio::test]
    async fn test_use_cases_share_session() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::POST, "/v1/auth/login", json_response(200, &tokens_body("access-1", "refresh-1")));
        transport.respond(Method::GET, "/v1/blacklist", json_response(200, r#"{"items":[]}"#));
        let container = AppContainer::with_transport(
            transport.clone(),
            &ClientConfig::new("http://api.test"),
            TokenStore::in_memory(),
        );

        container
            .auth
            .login(&LoginInput {
                email: "owner@acme.com".into(),
                password: "supersecret".into(),
            })
            .await
            .unwrap();
        assert_eq!(container.auth.status(), SessionStatus::Authenticated);

        container.blacklist.list().await.unwrap();
        let sent = transport.requests();
        assert_eq!(sent[1].header("authorization"), Some("Bearer access-1"));
    }
}
