//! Session refresh: one call to the refresh endpoint, optionally shared
//! between concurrently failing requests.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Credential, TokenStore};
use crate::error::PipelineError;
use crate::pipeline::transport::{PreparedRequest, Transport};

/// How concurrent Unauthorized failures map onto refresh calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Every failing request issues its own refresh call
    #[default]
    PerRequest,
    /// Requests failing while a refresh is in flight wait for that refresh
    SingleFlight,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Credential, PipelineError>>>;

pub(crate) struct RefreshCoordinator {
    policy: RefreshPolicy,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            in_flight: Mutex::new(None),
        }
    }

    pub(crate) fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub(crate) async fn run<F>(&self, start: F) -> Result<Credential, PipelineError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Credential, PipelineError>>,
    {
        if self.policy == RefreshPolicy::PerRequest {
            return start().await;
        }

        let shared = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight session refresh");
                    existing.clone()
                }
                None => {
                    let fresh = start().shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let result = shared.clone().await;

        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|f| f.ptr_eq(&shared)) {
            *slot = None;
        }
        result
    }
}

/// Call the refresh endpoint and apply the outcome to the token store:
/// login on success, logout on any failure.
pub(crate) async fn perform_refresh(
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
    request: PreparedRequest,
) -> Result<Credential, PipelineError> {
    info!(url = %request.url, "Refreshing session");
    let outcome = match transport.send(&request).await {
        Ok(response) if response.is_success() => response
            .json::<RefreshResponse>()
            .map_err(|e| PipelineError::RefreshFailed(e.to_string()))
            .and_then(|r| {
                if r.access_token.is_empty() {
                    Err(PipelineError::RefreshFailed(
                        "refresh endpoint returned an empty token".to_string(),
                    ))
                } else {
                    Ok(Credential::new(r.access_token))
                }
            }),
        Ok(response) => Err(PipelineError::RefreshFailed(format!(
            "refresh endpoint returned status {}: {}",
            response.status,
            response.text()
        ))),
        Err(e) => Err(PipelineError::RefreshFailed(e.to_string())),
    };

    match &outcome {
        Ok(credential) => tokens.login(credential.clone()),
        Err(e) => {
            warn!(error = %e, "Session refresh failed, signing out");
            tokens.logout();
        }
    }
    outcome
}
