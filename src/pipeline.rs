//! Authenticated Request Pipeline
//!
//! Wraps every outbound call to the backend. Each call carries the configured
//! base address, default headers and, when the token store holds one, the
//! bearer credential. A call rejected with 401 triggers exactly one refresh of
//! the session followed by exactly one replay of the original request:
//!
//! ```text
//! Issued ──2xx──────────────────────────────▶ Success
//!    │
//!    ├──401 (first time)──▶ refresh ──ok────▶ Issued (retried, new credential)
//!    │                          └──failed──▶ logout, RefreshFailed
//!    ├──401 (retried)──────────────────────▶ Unauthorized
//!    └──other status / network─────────────▶ Server / Network
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{Credential, TokenStore};
use crate::config::ApiConfig;
use crate::error::PipelineError;

pub mod cookies;
pub mod refresh;
pub mod transport;

pub use cookies::{PersistentCookieJar, StoredCookie};
pub use refresh::RefreshPolicy;
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, MultipartPart, PreparedRequest, RequestBody,
    Transport,
};

use refresh::{perform_refresh, RefreshCoordinator};

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";

/// Settings the pipeline applies to every call
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub base_url: String,
    pub default_headers: Vec<(String, String)>,
    pub refresh_path: String,
    pub refresh_policy: RefreshPolicy,
}

impl PipelineOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers: vec![(CONTENT_TYPE.to_string(), "application/json".to_string())],
            refresh_path: "/auth/refresh".to_string(),
            refresh_policy: RefreshPolicy::default(),
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }
}

impl From<&ApiConfig> for PipelineOptions {
    fn from(config: &ApiConfig) -> Self {
        let mut default_headers: Vec<(String, String)> = config
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        default_headers.sort();
        Self {
            base_url: config.base_url.clone(),
            default_headers,
            refresh_path: config.refresh_path.clone(),
            refresh_policy: config.refresh_policy,
        }
    }
}

pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
    options: PipelineOptions,
    refresh: RefreshCoordinator,
}

impl RequestPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenStore>,
        options: PipelineOptions,
    ) -> Self {
        let refresh = RefreshCoordinator::new(options.refresh_policy);
        Self {
            transport,
            tokens,
            options,
            refresh,
        }
    }

    /// Build a pipeline over a real HTTP transport. Session cookies live in
    /// the same storage as the token store's flag.
    pub fn from_config(config: &ApiConfig, tokens: Arc<TokenStore>) -> Result<Self, PipelineError> {
        let cookies = Arc::new(PersistentCookieJar::load(tokens.storage().clone()));
        let transport = HttpTransport::new(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
            cookies,
        )?;
        Ok(Self::new(Arc::new(transport), tokens, PipelineOptions::from(config)))
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Issue a request, recovering once from an expired credential
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let mut credential = self.tokens.token();
        let mut retried = false;

        loop {
            let prepared = self.prepare(&request, credential.as_ref());
            debug!(
                method = prepared.method.as_str(),
                url = %prepared.url,
                retried,
                "Issuing request"
            );
            let response = self.transport.send(&prepared).await?;

            if response.is_success() {
                return Ok(response);
            }

            if response.is_unauthorized() {
                if retried {
                    warn!(url = %prepared.url, "Request rejected again after refresh");
                    return Err(PipelineError::Unauthorized(response.text()));
                }
                retried = true;
                warn!(url = %prepared.url, "Credential rejected, refreshing session");
                credential = Some(self.refresh().await?);
                continue;
            }

            return Err(PipelineError::Server {
                status: response.status,
                body: response.text(),
            });
        }
    }

    /// Issue a request and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, PipelineError> {
        self.send(request).await?.json()
    }

    /// Run one refresh cycle under the configured [`RefreshPolicy`].
    ///
    /// On success the token store holds the new credential; on failure the
    /// token store is cleared.
    pub async fn refresh(&self) -> Result<Credential, PipelineError> {
        let transport = Arc::clone(&self.transport);
        let tokens = Arc::clone(&self.tokens);
        let request = self.refresh_request();
        self.refresh
            .run(move || perform_refresh(transport, tokens, request).boxed())
            .await
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh.policy()
    }

    fn refresh_request(&self) -> PreparedRequest {
        self.prepare(&ApiRequest::post(self.options.refresh_path.clone()), None)
    }

    fn prepare(&self, request: &ApiRequest, credential: Option<&Credential>) -> PreparedRequest {
        let mut headers: Vec<(String, String)> = self
            .options
            .default_headers
            .iter()
            .filter(|(name, _)| {
                !(name.eq_ignore_ascii_case(CONTENT_TYPE) && request.body.sets_content_type())
            })
            .filter(|(name, _)| !request.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        headers.extend(request.headers.iter().cloned());

        if let Some(credential) = credential {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
            headers.push((AUTHORIZATION.to_string(), credential.bearer()));
        }

        PreparedRequest {
            method: request.method,
            url: self.url(&request.path),
            headers,
            body: request.body.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.options.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
