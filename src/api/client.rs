use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::session::CredentialStore;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const METRIC_API_REQUEST: &str = "algoref_api_request_total";
const METRIC_API_LATENCY_MS: &str = "algoref_api_latency_ms";

/// Connection settings, sourced from the `[api]` settings section.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl From<&crate::config::ApiSettings> for ApiConfig {
    fn from(settings: &crate::config::ApiSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout: settings.timeout,
        }
    }
}

/// Request path below the base URL, kept as separate segments.
///
/// Segments added with [`ApiPath::segment`] are percent-encoded whole, so a
/// slug containing `/`, `?` or `#` stays a single path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

/// Static route such as `"auth/me"`; split on `/`.
impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// REST client for the catalog backend.
///
/// Attaches `Authorization: Bearer <access_token>` whenever the credential
/// store holds a token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let mut base = Url::parse(&config.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self { http, base, store })
    }

    pub fn user_agent() -> &'static str {
        concat!("algoref/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn url(&self, path: &ApiPath) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: impl Into<ApiPath>,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let bytes = self
            .execute(Method::GET, &path.into(), query, None::<&()>)
            .await?;
        decode(&bytes)
    }

    pub async fn post<B, T>(&self, path: impl Into<ApiPath>, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self
            .execute(Method::POST, &path.into(), &[], Some(body))
            .await?;
        decode(&bytes)
    }

    pub async fn put<B, T>(&self, path: impl Into<ApiPath>, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self
            .execute(Method::PUT, &path.into(), &[], Some(body))
            .await?;
        decode(&bytes)
    }

    pub async fn delete(&self, path: impl Into<ApiPath>) -> Result<(), ApiError> {
        self.execute(Method::DELETE, &path.into(), &[], None::<&()>)
            .await?;
        Ok(())
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &ApiPath,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = self.http.request(method.clone(), url);
        request = self.authorize(request).await;
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let outcome = request.send().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_API_LATENCY_MS, "method" => method.to_string()).record(elapsed_ms);

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                counter!(METRIC_API_REQUEST, "method" => method.to_string(), "status" => "error")
                    .increment(1);
                warn!(%method, %path, error = %err, "API request failed to complete");
                return Err(ApiError::Network(err));
            }
        };

        let status = response.status();
        counter!(
            METRIC_API_REQUEST,
            "method" => method.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
        let bytes = response.bytes().await.map_err(ApiError::Network)?;
        debug!(%method, %path, status = status.as_u16(), elapsed_ms, "API request completed");

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &bytes));
        }
        Ok(bytes.to_vec())
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.load().await {
            Ok(Some(credentials)) => request.bearer_auth(credentials.access_token),
            Ok(None) => request,
            Err(err) => {
                warn!(error = %err, "Could not read stored credentials; sending anonymously");
                request
            }
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    // DELETE-style endpoints may answer 204; treat that as JSON null.
    let bytes: &[u8] = if bytes.is_empty() { b"null" } else { bytes };
    serde_json::from_slice(bytes).map_err(|err| ApiError::Decode(err.to_string()))
}
