//! Single-flight access token refresh
//!
//! At most one refresh call is in flight at any time. Callers that observe a 401 while a
//! refresh is running join it instead of starting their own, and every joiner receives
//! the same outcome. Session bootstrap goes through the same slot.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ClientError, Result};
use crate::executor::RequestExecutor;
use crate::token_store::TokenStore;
use crate::transport::HttpTransport;
use crate::types::AuthTokens;

/// Result of one refresh attempt, shared by every joined caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(AuthTokens),
    /// The backend answered with an error status
    Rejected(ApiError),
    /// No response, including the refresh timeout
    Unreachable(String),
    /// Failure that is neither a backend rejection nor a network error
    Failed(String),
}

impl RefreshOutcome {
    fn into_result(self) -> Result<AuthTokens> {
        match self {
            RefreshOutcome::Refreshed(tokens) => Ok(tokens),
            RefreshOutcome::Rejected(api) => Err(ClientError::Api(api)),
            RefreshOutcome::Unreachable(reason) => Err(ClientError::Network(reason)),
            RefreshOutcome::Failed(message) => Err(ClientError::Unexpected(message)),
        }
    }
}

#[derive(Clone)]
struct PendingRefresh {
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
    refresh_token: Arc<str>,
    /// Set once a request-retry caller depends on this refresh
    fail_closed: Arc<AtomicBool>,
}

type Slot = Arc<Mutex<Option<PendingRefresh>>>;

/// Clears the in-flight slot when the refresh task finishes, however it finishes
struct SlotReset(Slot);

impl Drop for SlotReset {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// Owner of the refresh protocol
pub struct RefreshCoordinator<T> {
    executor: RequestExecutor<T>,
    store: TokenStore,
    refresh_timeout: Duration,
    in_flight: Slot,
}

impl<T: HttpTransport> RefreshCoordinator<T> {
    pub fn new(executor: RequestExecutor<T>, store: TokenStore, refresh_timeout: Duration) -> Self {
        Self {
            executor,
            store,
            refresh_timeout,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Obtain a usable access token after `rejected` was refused with a 401
    ///
    /// Returns `Ok(None)` when no token can be obtained, in which case the session has
    /// been cleared (or there was no refresh token to begin with).
    pub async fn refresh_access_token(&self, rejected: Option<&str>) -> Result<Option<String>> {
        let pending = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    // A refresh finished between the rejection and now.
                    if let Some(current) = self.store.access_token() {
                        if rejected != Some(current.as_str()) {
                            debug!("Access token already replaced, skipping refresh");
                            return Ok(Some(current));
                        }
                    }

                    let Some(refresh_token) = self.store.refresh_token() else {
                        debug!("No refresh token available, refresh impossible");
                        return Ok(None);
                    };

                    let pending = self.start_refresh(refresh_token);
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        pending.fail_closed.store(true, Ordering::SeqCst);

        match pending.outcome.clone().await {
            RefreshOutcome::Refreshed(tokens) => Ok(Some(tokens.access_token)),
            RefreshOutcome::Rejected(_) | RefreshOutcome::Unreachable(_) => {
                // The task may have settled before this caller joined.
                self.clear_if_current(&pending.refresh_token);
                Ok(None)
            }
            RefreshOutcome::Failed(message) => Err(ClientError::Unexpected(message)),
        }
    }

    /// Exchange `refresh_token` for a new pair, joining any refresh already in flight
    ///
    /// The new pair is stored on success. Only a 401 clears the session here; other
    /// failures are returned for the caller to classify.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthTokens> {
        let pending = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = self.start_refresh(refresh_token.to_string());
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.outcome.await.into_result()
    }

    /// True while a refresh call is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn clear_if_current(&self, failed_refresh_token: &str) {
        if self.store.refresh_token().as_deref() == Some(failed_refresh_token) {
            self.store.clear_all();
        }
    }

    /// Spawn the refresh so it completes even if every waiting caller goes away.
    ///
    /// Must be called with the slot lock held: the task's `SlotReset` takes the same lock,
    /// so it cannot clear the slot before the caller has filled it.
    fn start_refresh(&self, refresh_token: String) -> PendingRefresh {
        let executor = self.executor.clone();
        let store = self.store.clone();
        let timeout = self.refresh_timeout;
        let reset = SlotReset(Arc::clone(&self.in_flight));
        let refresh_token: Arc<str> = refresh_token.into();
        let fail_closed = Arc::new(AtomicBool::new(false));

        info!("Refreshing access token");

        let task = {
            let refresh_token = Arc::clone(&refresh_token);
            let fail_closed = Arc::clone(&fail_closed);
            tokio::spawn(async move {
                let _reset = reset;
                perform_refresh(&executor, &store, &refresh_token, timeout, &fail_closed).await
            })
        };

        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Token refresh task did not complete");
                    RefreshOutcome::Failed(format!("token refresh task failed: {e}"))
                }
            }
        }
        .boxed()
        .shared();

        PendingRefresh {
            outcome,
            refresh_token,
            fail_closed,
        }
    }
}

async fn perform_refresh<T: HttpTransport>(
    executor: &RequestExecutor<T>,
    store: &TokenStore,
    refresh_token: &str,
    timeout: Duration,
    fail_closed: &AtomicBool,
) -> RefreshOutcome {
    let result = match tokio::time::timeout(timeout, executor.refresh_tokens(refresh_token)).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Network(format!(
            "token refresh timed out after {}s",
            timeout.as_secs_f32()
        ))),
    };

    let outcome = match result {
        Ok(tokens) => {
            store.set_tokens(&tokens);
            info!(expires_in_secs = tokens.expires_in_seconds, "Access token refreshed");
            return RefreshOutcome::Refreshed(tokens);
        }
        Err(ClientError::Api(api)) => RefreshOutcome::Rejected(api),
        Err(ClientError::Network(reason)) => RefreshOutcome::Unreachable(reason),
        Err(e) => {
            error!(error = %e, "Token refresh failed unexpectedly");
            return RefreshOutcome::Failed(e.to_string());
        }
    };

    let rejected_token = matches!(&outcome, RefreshOutcome::Rejected(api) if api.is_unauthorized());
    if rejected_token || fail_closed.load(Ordering::SeqCst) {
        warn!(outcome = ?outcome, "Token refresh failed, clearing session");
        store.clear_all();
    } else {
        warn!(outcome = ?outcome, "Token refresh failed, keeping stored session");
    }
    outcome
}
