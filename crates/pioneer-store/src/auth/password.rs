//! Identity-toolkit password sign-in

use super::{AuthError, AuthErrorKind, AuthProvider, Credential, User};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`AuthProvider`] using `accounts:signInWithPassword`.
pub struct PasswordAuth {
    api_key: String,
    endpoint: String,
    client: Client,
    session: Arc<watch::Sender<Option<User>>>,
}

impl PasswordAuth {
    /// Create a provider for a project API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::new(AuthErrorKind::Other, e.to_string()))?;
        let (session, _) = watch::channel(None);

        Ok(Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client,
            session: Arc::new(session),
        })
    }

    /// Point at a different identity endpoint (emulator, test server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn sign_in_url(&self) -> String {
        format!(
            "{}/accounts:signInWithPassword?key={}",
            self.endpoint,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl AuthProvider for PasswordAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let request = SignInRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(self.sign_in_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Sign-in request failed");
                AuthError::new(AuthErrorKind::Network, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => AuthError::from_code(envelope.error.message, body),
                Err(_) => AuthError::new(AuthErrorKind::Other, format!("HTTP {}: {}", status, body)),
            };
            warn!(status = status.as_u16(), code = %err.code, "Sign-in rejected");
            return Err(err);
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| AuthError::new(AuthErrorKind::Other, format!("Invalid sign-in response: {}", e)))?;

        let user = User {
            uid: body.local_id,
            email: body.email.or_else(|| Some(email.to_string())),
        };
        info!(uid = %user.uid, "Signed in");
        self.session.send_replace(Some(user.clone()));

        Ok(Credential {
            user,
            id_token: body.id_token,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session.send_replace(None).is_some() {
            info!("Signed out");
        }
        Ok(())
    }

    fn session_changes(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }
}
