use reqwest::{Client, StatusCode};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::error::HhError;
use super::types::{Credentials, TokenResponse};
use crate::config::CredentialFile;

/// OAuth client identity registered with HeadHunter.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Sole owner of the access/refresh pair.
///
/// Shared behind an `Arc` with every component that makes authenticated
/// calls. Refreshes are serialized; readers always see the latest pair.
pub struct CredentialManager {
    http: Client,
    oauth: OAuthClient,
    credentials: RwLock<Credentials>,
    refresh_lock: Mutex<()>,
    file: Option<CredentialFile>,
}

impl CredentialManager {
    /// `file` is where refreshed credentials are written back; `None` keeps
    /// them in memory only.
    pub fn new(
        http: Client,
        oauth: OAuthClient,
        credentials: Credentials,
        file: Option<CredentialFile>,
    ) -> Self {
        Self {
            http,
            oauth,
            credentials: RwLock::new(credentials),
            refresh_lock: Mutex::new(()),
            file,
        }
    }

    pub async fn access_token(&self) -> String {
        self.credentials.read().await.access_token.clone()
    }

    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    /// Exchanges the current refresh token for a new pair.
    ///
    /// On a non-200 answer the stored pair is left untouched and
    /// [`HhError::RefreshRejected`] is returned.
    pub async fn refresh(&self) -> Result<(), HhError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refreshes unless another caller already replaced `rejected_token`
    /// while this one waited for the lock.
    pub async fn refresh_after(&self, rejected_token: &str) -> Result<(), HhError> {
        let _guard = self.refresh_lock.lock().await;
        if self.credentials.read().await.access_token != rejected_token {
            info!("access token already refreshed by a concurrent caller");
            return Ok(());
        }
        self.refresh_locked().await
    }

    /// Trades an authorization code for the first credential pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<(), HhError> {
        let _guard = self.refresh_lock.lock().await;
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
        ];
        if let Some(uri) = redirect_uri {
            form.push(("redirect_uri", uri));
        }
        let tokens = self.request_tokens(&form).await?;
        self.install(tokens.into()).await
    }

    async fn refresh_locked(&self) -> Result<(), HhError> {
        let refresh_token = self.credentials.read().await.refresh_token.clone();
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
        ];
        let tokens = self.request_tokens(&form).await?;
        self.install(tokens.into()).await
    }

    async fn request_tokens(&self, form: &[(&str, &str)]) -> Result<TokenResponse, HhError> {
        let response = self
            .http
            .post(&self.oauth.token_url)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!(status = status.as_u16(), %message, "token endpoint rejected credential exchange");
            return Err(HhError::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let tokens = response.json::<TokenResponse>().await?;
        debug!(expires_in = ?tokens.expires_in, "token endpoint issued new credentials");
        Ok(tokens)
    }

    // The new pair is live in memory even if writing it back fails: the
    // old refresh token has already been consumed by the server.
    async fn install(&self, fresh: Credentials) -> Result<(), HhError> {
        info!(access_token = %fresh.access_token_prefix(), "access token updated");
        *self.credentials.write().await = fresh.clone();
        if let Some(file) = &self.file {
            file.persist(&fresh).inspect_err(|e| {
                error!(path = %file.path().display(), error = %e, "failed to persist credentials");
            })?;
        }
        Ok(())
    }
}
