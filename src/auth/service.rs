//! Sign-in, sign-out and cold-start session restore

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{Credential, TokenStore};
use crate::error::{ClientError, PipelineError};
use crate::pipeline::{ApiRequest, RequestPipeline};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    pipeline: Arc<RequestPipeline>,
}

impl AuthService {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        self.pipeline.tokens()
    }

    pub async fn sign_up(&self, request: &SignUp) -> Result<(), ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        self.pipeline.send(ApiRequest::post("/auth/").json(body)).await?;
        info!(username = %request.username, "Account created");
        Ok(())
    }

    /// Exchange a password for a credential, then fetch the signed-in profile
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let form = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let token: TokenResponse = self
            .pipeline
            .send_json(ApiRequest::post("/auth/token").form(form))
            .await?;
        if token.access_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "token response carried an empty access_token".to_string(),
            ));
        }
        let credential = Credential::new(token.access_token);
        self.tokens().login(credential.clone());

        let profile: UserProfile = self
            .pipeline
            .send_json(ApiRequest::get("/auth/me").header("Authorization", credential.bearer()))
            .await?;
        info!(username = %profile.username, "Signed in");
        Ok(profile)
    }

    /// End the session on the server and locally.
    ///
    /// Local state is cleared even when the server call fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = self.pipeline.send(ApiRequest::post("/auth/logout")).await;
        self.tokens().logout();
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Server logout failed; local session cleared anyway");
                Err(e.into())
            }
        }
    }

    /// Restore a session on cold start.
    ///
    /// When the persisted flag says a session existed, one refresh is
    /// attempted to reacquire the credential. Returns whether the client ends
    /// up authenticated.
    pub async fn initialize_session(&self) -> bool {
        if self.tokens().is_authenticated() {
            return true;
        }
        if !self.tokens().was_authenticated() {
            return false;
        }
        match self.pipeline.refresh().await {
            Ok(_) => {
                info!("Session restored");
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not restore session");
                false
            }
        }
    }
}
