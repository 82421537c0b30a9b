//! Backend wire payloads (snake_case) and their mapping into domain types

use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub tenant_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body for both `/v1/auth/refresh` and `/v1/auth/logout`
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateSystemPromptRequest<'a> {
    pub system_prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateControlModeRequest {
    pub control_mode: ControlMode,
}

#[derive(Debug, Serialize)]
pub struct AddBlacklistRequest<'a> {
    pub whatsapp_user_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// The `detail` field when it is a non-blank string
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .filter(|detail| !detail.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct SystemPromptResponse {
    pub tenant_id: String,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedSignupSessionResponse {
    pub state: String,
    pub connect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct WhatsappConnectionResponse {
    pub tenant_id: String,
    pub status: WhatsappConnectionStatus,
    pub phone_number_id: Option<String>,
    pub business_account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationSummaryResponse {
    pub conversation_id: String,
    pub whatsapp_user_id: String,
    pub last_message_preview: Option<String>,
    pub updated_at: String,
    pub control_mode: ControlMode,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message_id: String,
    pub conversation_id: String,
    pub role: String,
    pub direction: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ControlModeResponse {
    pub conversation_id: String,
    pub tenant_id: String,
    pub control_mode: ControlMode,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct BlacklistEntryResponse {
    pub tenant_id: String,
    pub whatsapp_user_id: String,
    pub created_at: String,
}

/// `{ "items": [...] }` envelope used by every list endpoint
#[derive(Debug, Deserialize)]
pub struct ItemList<T> {
    pub items: Vec<T>,
}

impl<T> ItemList<T> {
    pub fn into_domain<D: From<T>>(self) -> Vec<D> {
        self.items.into_iter().map(D::from).collect()
    }
}

impl From<AuthTokensResponse> for AuthTokens {
    fn from(payload: AuthTokensResponse) -> Self {
        Self {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_in_seconds: payload.expires_in_seconds,
        }
    }
}

impl From<SystemPromptResponse> for SystemPrompt {
    fn from(payload: SystemPromptResponse) -> Self {
        Self {
            tenant_id: payload.tenant_id,
            system_prompt: payload.system_prompt,
        }
    }
}

impl From<EmbeddedSignupSessionResponse> for EmbeddedSignupSession {
    fn from(payload: EmbeddedSignupSessionResponse) -> Self {
        Self {
            state: payload.state,
            connect_url: payload.connect_url,
        }
    }
}

impl From<WhatsappConnectionResponse> for WhatsappConnection {
    fn from(payload: WhatsappConnectionResponse) -> Self {
        Self {
            tenant_id: payload.tenant_id,
            status: payload.status,
            phone_number_id: payload.phone_number_id,
            business_account_id: payload.business_account_id,
        }
    }
}

impl From<ConversationSummaryResponse> for ConversationSummary {
    fn from(payload: ConversationSummaryResponse) -> Self {
        Self {
            conversation_id: payload.conversation_id,
            whatsapp_user_id: payload.whatsapp_user_id,
            last_message_preview: payload.last_message_preview,
            updated_at: payload.updated_at,
            control_mode: payload.control_mode,
        }
    }
}

impl From<MessageResponse> for ConversationMessage {
    fn from(payload: MessageResponse) -> Self {
        Self {
            message_id: payload.message_id,
            conversation_id: payload.conversation_id,
            role: payload.role,
            direction: payload.direction,
            content: payload.content,
            created_at: payload.created_at,
        }
    }
}

impl From<BlacklistEntryResponse> for BlacklistEntry {
    fn from(payload: BlacklistEntryResponse) -> Self {
        Self {
            tenant_id: payload.tenant_id,
            whatsapp_user_id: payload.whatsapp_user_id,
            created_at: payload.created_at,
        }
    }
}
