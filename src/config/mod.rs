//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use algoref_api_types::{Id, SortBy, SortOrder};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::cache::{DEFAULT_IDLE_EVICTION_SECS, DEFAULT_JANITOR_INTERVAL_SECS};
use crate::query::{DEFAULT_DEBOUNCE_MS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::session::DEFAULT_LOGIN_PATH;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "algoref";
const ENV_PREFIX: &str = "ALGOREF";
const DEFAULT_STORAGE_DIR: &str = ".algoref";

/// Command-line arguments for the algoref binary.
#[derive(Debug, Parser)]
#[command(name = "algoref", version, about = "Algorithm reference catalog client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ALGOREF_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the backend API base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the directory holding stored credentials.
    #[arg(long = "storage-dir", value_name = "PATH", global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Browse published algorithms.
    Algorithms(AlgorithmsArgs),
    /// Browse categories.
    Categories(CategoriesArgs),
    /// Browse programming languages.
    Languages(LanguagesArgs),
    /// Sign in and store the issued tokens.
    Login(LoginArgs),
    /// Delete stored tokens.
    Logout,
    /// Validate the stored session against the backend.
    Whoami,
    /// Exchange the stored refresh token for a new pair.
    Refresh,
    /// Admin writes (requires a signed-in session).
    Admin(AdminArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AlgorithmsArgs {
    #[command(subcommand)]
    pub command: AlgorithmsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum AlgorithmsCommand {
    /// List algorithms with optional filters.
    List(ListArgs),
    /// Show one algorithm by slug.
    Show {
        #[arg(value_name = "SLUG")]
        slug: String,
    },
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// Full-text search.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Category id.
    #[arg(long, value_name = "ID")]
    pub category: Option<Id>,

    /// Difficulty id.
    #[arg(long, value_name = "ID")]
    pub difficulty: Option<Id>,

    #[arg(long, value_name = "PAGE")]
    pub page: Option<u32>,

    #[arg(long, value_name = "SIZE")]
    pub size: Option<u32>,

    #[arg(long = "sort-by", value_enum, value_name = "FIELD")]
    pub sort_by: Option<SortField>,

    #[arg(long, value_enum, value_name = "ORDER")]
    pub order: Option<SortDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Title,
    ViewCount,
    CreatedAt,
}

impl From<SortField> for SortBy {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Title => SortBy::Title,
            SortField::ViewCount => SortBy::ViewCount,
            SortField::CreatedAt => SortBy::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl From<SortDirection> for SortOrder {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => SortOrder::Asc,
            SortDirection::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CategoriesCommand {
    List,
    /// Show one category by slug.
    Show {
        #[arg(value_name = "SLUG")]
        slug: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct LanguagesArgs {
    #[command(subcommand)]
    pub command: LanguagesCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum LanguagesCommand {
    List,
}

#[derive(Debug, Args, Clone)]
pub struct LoginArgs {
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    #[arg(long, env = "ALGOREF_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args, Clone)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum AdminCommand {
    /// Create an algorithm from a JSON file.
    Create {
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Apply a partial update from a JSON file.
    Update {
        #[arg(long, value_name = "ID")]
        id: Id,
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Delete an algorithm.
    Delete {
        #[arg(long, value_name = "ID")]
        id: Id,
    },
    /// Attach a code template from a JSON file.
    AddTemplate {
        #[arg(long, value_name = "ID")]
        id: Id,
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub query: QuerySettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub idle_eviction: Duration,
    /// `None` when `janitor_interval_seconds` is 0.
    pub janitor_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub debounce: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub login_path: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    storage: RawStorageSettings,
    cache: RawCacheSettings,
    query: RawQuerySettings,
    auth: RawAuthSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(directory) = overrides.storage_dir.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            storage,
            cache,
            query,
            auth,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            storage: build_storage_settings(storage)?,
            cache: build_cache_settings(cache)?,
            query: build_query_settings(query)?,
            auth: build_auth_settings(auth)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = api
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let parsed = Url::parse(&base_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let directory = storage
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.directory",
            "path must not be empty",
        ));
    }
    Ok(StorageSettings { directory })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let idle_secs = cache
        .idle_eviction_seconds
        .unwrap_or(DEFAULT_IDLE_EVICTION_SECS);
    if idle_secs == 0 {
        return Err(LoadError::invalid(
            "cache.idle_eviction_seconds",
            "must be greater than zero",
        ));
    }
    let janitor_secs = cache
        .janitor_interval_seconds
        .unwrap_or(DEFAULT_JANITOR_INTERVAL_SECS);

    Ok(CacheSettings {
        idle_eviction: Duration::from_secs(idle_secs),
        janitor_interval: (janitor_secs > 0).then(|| Duration::from_secs(janitor_secs)),
    })
}

fn build_query_settings(query: RawQuerySettings) -> Result<QuerySettings, LoadError> {
    let max_page_size = query.max_page_size.unwrap_or(MAX_PAGE_SIZE);
    if max_page_size == 0 {
        return Err(LoadError::invalid(
            "query.max_page_size",
            "must be greater than zero",
        ));
    }
    let default_page_size = query.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if default_page_size == 0 || default_page_size > max_page_size {
        return Err(LoadError::invalid(
            "query.default_page_size",
            format!("must be between 1 and {max_page_size}"),
        ));
    }

    Ok(QuerySettings {
        debounce: Duration::from_millis(query.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
        default_page_size,
        max_page_size,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let login_path = auth
        .login_path
        .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
    if !login_path.starts_with('/') {
        return Err(LoadError::invalid(
            "auth.login_path",
            "must be an absolute path starting with '/'",
        ));
    }
    Ok(AuthSettings { login_path })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    idle_eviction_seconds: Option<u64>,
    janitor_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    debounce_ms: Option<u64>,
    default_page_size: Option<u32>,
    max_page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    login_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
