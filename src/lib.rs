//! Agent Console Client
//!
//! Backend client for the WhatsApp AI-agent tenant console, with bearer authentication,
//! single-flight access token refresh and a fail-closed session lifecycle.

pub mod api_client;
pub mod config;
pub mod container;
pub mod error;
pub mod executor;
pub mod logging;
pub mod persistence;
pub mod refresh;
pub mod token_store;
pub mod transport;
pub mod types;
pub mod ui_error;
pub mod use_cases;
pub mod wire;

#[cfg(test)]
mod tests;

pub use api_client::{ApiClient, BackendApi};
pub use crate::config::ClientConfig;
pub use container::AppContainer;
pub use error::{ApiError, ClientError, Result};
pub use persistence::{FilePersistence, MemoryPersistence, RefreshTokenPersistence};
pub use refresh::RefreshCoordinator;
pub use token_store::TokenStore;
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::*;
pub use ui_error::resolve_ui_error_message;
