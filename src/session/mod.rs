//! Session handling: durable credentials, sign-in flows and the guard that
//! gates protected views.

mod auth;
mod guard;
mod storage;

pub use auth::{AuthFlows, LOGIN_FAILED_MESSAGE, SessionError};
pub use guard::{DEFAULT_LOGIN_PATH, GuardState, GuardView, SessionGuard};
pub use storage::{
    CREDENTIALS_FILE, CredentialStore, FileCredentialStore, MemoryCredentialStore, StorageError,
    StoredCredentials,
};
