use std::sync::Arc;

use algoref_api_types::{LoginRequest, RefreshTokenRequest, TokenResponse};
use thiserror::Error;
use tracing::{info, warn};

use super::guard::SessionGuard;
use super::storage::{CredentialStore, StorageError, StoredCredentials};
use crate::api::{ApiClient, ApiError};
use crate::cache::{RequestCache, Tag, TagKind, TagSet};

pub const LOGIN_FAILED_MESSAGE: &str = "Invalid credentials. Please try again.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("not signed in")]
    NotSignedIn,
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) if err.is_auth() => LOGIN_FAILED_MESSAGE.to_string(),
            Self::Api(err) => err.user_message(LOGIN_FAILED_MESSAGE),
            other => other.to_string(),
        }
    }
}

/// Login, logout and token refresh. The only writers of stored credentials
/// besides the guard.
#[derive(Clone)]
pub struct AuthFlows {
    client: ApiClient,
    store: Arc<dyn CredentialStore>,
    guard: SessionGuard,
    cache: RequestCache,
}

impl AuthFlows {
    pub fn new(
        client: ApiClient,
        store: Arc<dyn CredentialStore>,
        guard: SessionGuard,
        cache: RequestCache,
    ) -> Self {
        Self {
            client,
            store,
            guard,
            cache,
        }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// Exchange email and password for a token pair and store both tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, SessionError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let tokens: TokenResponse = self.client.post("auth/login", &request).await?;
        self.store
            .save(&StoredCredentials::new(
                tokens.access_token.clone(),
                tokens.refresh_token.clone(),
            ))
            .await?;
        self.guard.credentials_stored();
        self.forget_current_user();
        info!(email, expires_in = tokens.expires_in, "Signed in");
        Ok(tokens)
    }

    pub async fn logout(&self) {
        self.guard.sign_out().await;
        self.forget_current_user();
    }

    /// Trade the stored refresh token for a new pair.
    ///
    /// A rejected refresh token is a hard logout.
    pub async fn refresh(&self) -> Result<TokenResponse, SessionError> {
        let stored = self.store.load().await?.ok_or(SessionError::NotSignedIn)?;
        let request = RefreshTokenRequest {
            refresh_token: stored.refresh_token,
        };

        match self
            .client
            .post::<_, TokenResponse>("auth/refresh", &request)
            .await
        {
            Ok(tokens) => {
                self.store
                    .save(&StoredCredentials::new(
                        tokens.access_token.clone(),
                        tokens.refresh_token.clone(),
                    ))
                    .await?;
                self.guard.credentials_stored();
                info!(expires_in = tokens.expires_in, "Tokens refreshed");
                Ok(tokens)
            }
            Err(err) => {
                if self.guard.escalate(&err).await {
                    self.forget_current_user();
                } else {
                    warn!(error = %err, "Token refresh failed");
                }
                Err(err.into())
            }
        }
    }

    fn forget_current_user(&self) {
        self.cache
            .invalidate(&TagSet::from([Tag::current(TagKind::User)]));
    }
}
