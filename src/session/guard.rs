use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use algoref_api_types::CurrentUser;
use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::storage::CredentialStore;
use crate::api::ApiClient;
use crate::cache::ErrorInfo;

pub const DEFAULT_LOGIN_PATH: &str = "/admin";

const METRIC_SESSION_REJECTED: &str = "algoref_session_rejected_total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    Validating,
    Authenticated(CurrentUser),
}

/// What a protected view renders for the current guard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Protected(CurrentUser),
    Redirect(String),
}

struct Inner {
    client: ApiClient,
    store: Arc<dyn CredentialStore>,
    login_path: String,
    state: watch::Sender<GuardState>,
    /// Bumped on every mount and logout; stale validations are ignored.
    epoch: AtomicU64,
}

/// Gate for protected views.
///
/// Validity comes only from the backend's `/auth/me` answer. Any rejection is
/// a hard logout: both tokens are deleted and the state returns to
/// `Unauthenticated`.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<Inner>,
}

impl SessionGuard {
    /// Start in `Validating` when a credential is stored, else `Unauthenticated`.
    pub async fn new(
        client: ApiClient,
        store: Arc<dyn CredentialStore>,
        login_path: impl Into<String>,
    ) -> Self {
        let initial = match store.load().await {
            Ok(Some(_)) => GuardState::Validating,
            Ok(None) => GuardState::Unauthenticated,
            Err(err) => {
                warn!(error = %err, "Stored credentials unreadable; starting signed out");
                GuardState::Unauthenticated
            }
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                login_path: login_path.into(),
                state,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    pub fn state(&self) -> GuardState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.inner.state.subscribe()
    }

    pub fn view(&self) -> GuardView {
        self.render(&self.inner.state.borrow())
    }

    /// Validate the stored credential for one mount of a protected view.
    ///
    /// Without a stored credential no request is made. Otherwise exactly one
    /// `/auth/me` call is made.
    pub async fn mount(&self) -> GuardView {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let stored = match self.inner.store.load().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "Stored credentials unreadable");
                None
            }
        };
        if stored.is_none() {
            debug!("No stored credential; redirecting to login");
            self.transition(epoch, GuardState::Unauthenticated);
            return self.view();
        }

        self.transition(epoch, GuardState::Validating);
        match self.inner.client.get::<CurrentUser>("auth/me", &[]).await {
            Ok(user) => {
                debug!(user_id = user.id, role = %user.role, "Session validated");
                self.transition(epoch, GuardState::Authenticated(user));
            }
            Err(err) => {
                if self.inner.epoch.load(Ordering::SeqCst) == epoch {
                    self.hard_logout(&ErrorInfo::from(&err)).await;
                }
            }
        }
        self.view()
    }

    /// Route a failure seen elsewhere into the guard.
    ///
    /// Auth failures force a hard logout and return `true`; other errors are
    /// left to the caller.
    pub async fn escalate<E>(&self, error: E) -> bool
    where
        ErrorInfo: From<E>,
    {
        let info = ErrorInfo::from(error);
        if !info.is_auth() {
            return false;
        }
        self.hard_logout(&info).await;
        true
    }

    /// Explicit sign-out.
    pub async fn sign_out(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.clear_credentials().await;
        self.inner.state.send_replace(GuardState::Unauthenticated);
        info!("Signed out");
    }

    /// A fresh credential was stored; the next mount validates it.
    pub(crate) fn credentials_stored(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(GuardState::Validating);
    }

    async fn hard_logout(&self, reason: &ErrorInfo) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        counter!(METRIC_SESSION_REJECTED).increment(1);
        self.clear_credentials().await;
        self.inner.state.send_replace(GuardState::Unauthenticated);
        info!(
            reason = %reason,
            redirect = %self.inner.login_path,
            "Session rejected; credentials cleared"
        );
    }

    async fn clear_credentials(&self) {
        if let Err(err) = self.inner.store.clear().await {
            warn!(error = %err, "Failed to clear stored credentials");
        }
    }

    fn transition(&self, epoch: u64, next: GuardState) {
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Ignoring superseded guard transition");
            return;
        }
        self.inner.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    fn render(&self, state: &GuardState) -> GuardView {
        match state {
            GuardState::Unauthenticated => GuardView::Redirect(self.inner.login_path.clone()),
            GuardState::Validating => GuardView::Loading,
            GuardState::Authenticated(user) => GuardView::Protected(user.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::cache::FailureKind;
    use crate::session::{MemoryCredentialStore, StoredCredentials};

    fn offline_client(store: Arc<dyn CredentialStore>) -> ApiClient {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9/api/v1".to_string(),
            ..ApiConfig::default()
        };
        ApiClient::new(&config, store).expect("client")
    }

    #[tokio::test]
    async fn starts_validating_with_stored_credential() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_credentials(
            StoredCredentials::new("a", "r"),
        ));
        let guard = SessionGuard::new(offline_client(Arc::clone(&store)), store, "/admin").await;
        assert_eq!(guard.state(), GuardState::Validating);
        assert_eq!(guard.view(), GuardView::Loading);
    }

    #[tokio::test]
    async fn mount_without_credential_redirects() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let guard = SessionGuard::new(offline_client(Arc::clone(&store)), store, "/admin").await;
        assert_eq!(guard.mount().await, GuardView::Redirect("/admin".to_string()));
    }

    #[tokio::test]
    async fn non_auth_errors_are_not_escalated() {
        let memory = Arc::new(MemoryCredentialStore::with_credentials(
            StoredCredentials::new("a", "r"),
        ));
        let store: Arc<dyn CredentialStore> = memory.clone();
        let guard = SessionGuard::new(offline_client(Arc::clone(&store)), store, "/admin").await;

        let network = ErrorInfo::new(FailureKind::Network, None, "offline");
        assert!(!guard.escalate(network).await);
        assert!(memory.snapshot().is_some());

        let auth = ErrorInfo::new(FailureKind::Auth, Some(401), "expired");
        assert!(guard.escalate(auth).await);
        assert!(memory.snapshot().is_none());
        assert_eq!(guard.state(), GuardState::Unauthenticated);
    }
}
