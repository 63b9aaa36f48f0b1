//! Command handlers for the `algoref` binary.

mod handlers;
mod io;
mod print;

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, ApiConfig, Catalog};
use crate::cache::{CacheConfig, RequestCache};
use crate::config::{Command, Settings};
use crate::error::AppError;
use crate::mutation::MutationOrchestrator;
use crate::query::{QueryConfig, QueryController};
use crate::session::{AuthFlows, CredentialStore, FileCredentialStore, SessionGuard};

pub use io::read_json;
pub use print::print_json;

/// Wired-up components shared by every command.
#[derive(Clone)]
pub struct App {
    pub cache: RequestCache,
    pub catalog: Catalog,
    pub controller: QueryController,
    pub guard: SessionGuard,
    pub auth: AuthFlows,
    pub mutations: MutationOrchestrator,
}

impl App {
    /// Build with credentials kept under `settings.storage.directory`.
    pub async fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(&settings.storage.directory));
        Self::with_store(settings, store).await
    }

    pub async fn with_store(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, AppError> {
        let cache = RequestCache::new(CacheConfig::from(&settings.cache));
        if cache.spawn_janitor().is_some() {
            debug!(interval = ?cache.config().janitor_interval, "Cache janitor started");
        }
        let client = ApiClient::new(&ApiConfig::from(&settings.api), Arc::clone(&store))?;
        let guard =
            SessionGuard::new(client.clone(), Arc::clone(&store), &settings.auth.login_path).await;
        let auth = AuthFlows::new(client.clone(), store, guard.clone(), cache.clone());
        let catalog = Catalog::new(client.clone(), cache.clone()).with_guard(guard.clone());
        let mutations = MutationOrchestrator::new(client, cache.clone(), guard.clone());
        let controller = QueryController::new(QueryConfig::from(&settings.query));

        Ok(Self {
            cache,
            catalog,
            controller,
            guard,
            auth,
            mutations,
        })
    }
}

pub async fn dispatch(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Algorithms(args) => handlers::algorithms(app, args.command).await,
        Command::Categories(args) => handlers::categories(app, args.command).await,
        Command::Languages(args) => handlers::languages(app, args.command).await,
        Command::Login(args) => handlers::login(app, &args.email, &args.password).await,
        Command::Logout => handlers::logout(app).await,
        Command::Whoami => handlers::whoami(app).await,
        Command::Refresh => handlers::refresh(app).await,
        Command::Admin(args) => handlers::admin(app, args.command).await,
    }
}
