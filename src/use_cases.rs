//! Use cases called by the rendering layer

use std::sync::Arc;
use tracing::{info, warn};

use crate::api_client::BackendApi;
use crate::error::{ClientError, Result};
use crate::token_store::TokenStore;
use crate::types::*;

/// Session lifecycle: bootstrap, login, register, logout
pub struct AuthUseCase<A> {
    api: Arc<A>,
    store: TokenStore,
}

impl<A: BackendApi> AuthUseCase<A> {
    pub fn new(api: Arc<A>, store: TokenStore) -> Self {
        Self { api, store }
    }

    /// Recover a session at startup
    ///
    /// Returns `true` when the console can proceed as authenticated.
    pub async fn bootstrap_session(&self) -> Result<bool> {
        if self.store.access_token().is_some() {
            self.store.publish_status(SessionStatus::Authenticated);
            return Ok(true);
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            self.store.publish_status(SessionStatus::Anonymous);
            return Ok(false);
        };

        self.store.publish_status(SessionStatus::Loading);

        match self.api.refresh(&refresh_token).await {
            Ok(tokens) => {
                if self.store.access_token().as_deref() != Some(tokens.access_token.as_str()) {
                    self.store.set_tokens(&tokens);
                }
                info!("Session restored from refresh token");
                Ok(true)
            }
            Err(e) if e.is_unauthorized() => {
                info!("Stored refresh token rejected, clearing session");
                self.store.clear_all();
                Ok(false)
            }
            Err(ClientError::Network(reason)) => {
                warn!(error = %reason, "Backend unreachable during session bootstrap");
                self.store.publish_status(SessionStatus::Anonymous);
                Ok(false)
            }
            Err(e) => {
                self.store.publish_status(SessionStatus::Anonymous);
                Err(e)
            }
        }
    }

    pub async fn login(&self, input: &LoginInput) -> Result<()> {
        let tokens = self.api.login(input).await?;
        self.store.set_tokens(&tokens);
        Ok(())
    }

    pub async fn register(&self, input: &RegisterInput) -> Result<()> {
        let tokens = self.api.register(input).await?;
        self.store.set_tokens(&tokens);
        Ok(())
    }

    /// Revoke the refresh token server-side (best effort) and clear the local session
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh_token) = self.store.refresh_token() {
            match self.api.logout(&refresh_token).await {
                Ok(()) => {}
                Err(e) if e.is_api_or_network() => {
                    warn!(error = %e, "Logout request failed, clearing session locally");
                }
                Err(e) => return Err(e),
            }
        }

        self.store.clear_all();
        Ok(())
    }

    pub fn has_active_session(&self) -> bool {
        self.store.has_active_session()
    }

    pub fn status(&self) -> SessionStatus {
        self.store.status()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SessionStatus> {
        self.store.subscribe()
    }
}

pub struct AgentUseCase<A> {
    api: Arc<A>,
}

impl<A: BackendApi> AgentUseCase<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn get_system_prompt(&self) -> Result<SystemPrompt> {
        self.api.get_system_prompt().await
    }

    pub async fn update_system_prompt(&self, system_prompt: &str) -> Result<SystemPrompt> {
        self.api.update_system_prompt(system_prompt).await
    }
}

pub struct ConversationUseCase<A> {
    api: Arc<A>,
}

impl<A: BackendApi> ConversationUseCase<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.api.list_conversations().await
    }

    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        self.api.list_conversation_messages(conversation_id).await
    }

    /// Hand a conversation to a human operator or back to the agent
    pub async fn update_control_mode(
        &self,
        conversation_id: &str,
        control_mode: ControlMode,
    ) -> Result<ControlMode> {
        self.api
            .update_conversation_control_mode(conversation_id, control_mode)
            .await
    }
}

pub struct BlacklistUseCase<A> {
    api: Arc<A>,
}

impl<A: BackendApi> BlacklistUseCase<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<BlacklistEntry>> {
        self.api.list_blacklist().await
    }

    pub async fn add(&self, whatsapp_user_id: &str) -> Result<BlacklistEntry> {
        self.api.add_blacklist(whatsapp_user_id).await
    }

    pub async fn remove(&self, whatsapp_user_id: &str) -> Result<()> {
        self.api.remove_blacklist(whatsapp_user_id).await
    }
}

pub struct WhatsappOnboardingUseCase<A> {
    api: Arc<A>,
}

impl<A: BackendApi> WhatsappOnboardingUseCase<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn get_connection_status(&self) -> Result<WhatsappConnection> {
        self.api.get_whatsapp_connection().await
    }

    pub async fn create_embedded_signup_session(&self) -> Result<EmbeddedSignupSession> {
        self.api.create_embedded_signup_session().await
    }
}
