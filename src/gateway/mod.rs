//! Offline cache gateway.
//!
//! Intercepts same-origin GET requests from the app shell and decides, per
//! request, whether to answer from a versioned cache partition or from the
//! network. The gateway keeps no state of its own beyond the partitions in
//! its [`CacheStorage`], so concurrent requests only share that store.

pub mod cache;
pub mod host;
pub mod http;

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::notification::{Notification, APP_NAME, NOTIFICATION_TAG};
use cache::CacheStorage;
use host::{ClickAction, ControlMessage, Host, Reply};
use http::{CacheMode, FetchError, Fetcher, Method, Request, Response, ResponseKind};

pub const DEFAULT_VERSION: &str = "1.0.0";

pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/manifest.json",
    "/icons/icon-192x192.svg",
    "/icons/icon-512x512.svg",
];

const PUSH_FALLBACK_BODY: &str = "Time to take a break!";
const PUSH_ICON: &str = "/icons/icon-192x192.svg";
const APP_ROOT: &str = "/";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub version: String,
    pub origin: Url,
    /// Root-relative paths pre-cached at install.
    pub static_assets: Vec<String>,
    /// Served to HTML requests when both cache and network fail.
    pub offline_document: String,
    /// Upper bound on a single network fetch; `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            origin,
            static_assets: DEFAULT_STATIC_ASSETS.iter().map(|p| p.to_string()).collect(),
            offline_document: "/index.html".to_string(),
            fetch_timeout: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn static_partition(&self) -> String {
        format!("poromodo-static-v{}", self.version)
    }

    pub fn dynamic_partition(&self) -> String {
        format!("poromodo-dynamic-v{}", self.version)
    }

    /// Name reported in reply to `GetVersion`
    pub fn version_name(&self) -> String {
        format!("poromodo-v{}", self.version)
    }

    /// Static entries match with or without their leading slash.
    pub fn is_static(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.static_assets
            .iter()
            .any(|asset| asset.trim_start_matches('/') == path)
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request for {url} failed and no cached copy exists: {source}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("invalid static asset path {path:?}: {source}")]
    BadAssetPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("pre-caching {path} failed: {source}")]
    InstallFetch {
        path: String,
        #[source]
        source: FetchError,
    },
    #[error("pre-caching {path} returned status {status}")]
    InstallStatus { path: String, status: u16 },
}

/// What the gateway did with an intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the platform performs the request itself.
    Passthrough,
    Respond(Response),
}

pub struct CacheGateway<F, C, H> {
    config: GatewayConfig,
    fetcher: F,
    cache: C,
    host: H,
}

impl<F: Fetcher, C: CacheStorage, H: Host> CacheGateway<F, C, H> {
    pub fn new(config: GatewayConfig, fetcher: F, cache: C, host: H) -> Self {
        Self {
            config,
            fetcher,
            cache,
            host,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(request))
                .await
                .map_err(|_| FetchError::Timeout(limit))?,
            None => self.fetcher.fetch(request).await,
        }
    }

    /// Pre-caches every static asset, all or nothing, then asks to take over
    /// immediately.
    pub async fn install(&self) -> Result<(), GatewayError> {
        info!(version = %self.config.version, "installing");
        let partition = self.config.static_partition();
        let mut fetched = Vec::with_capacity(self.config.static_assets.len());

        for path in &self.config.static_assets {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|source| GatewayError::BadAssetPath {
                    path: path.clone(),
                    source,
                })?;
            let request = Request::get(url).with_cache_mode(CacheMode::Reload);
            let response = self.fetch(&request).await.map_err(|source| {
                warn!(path = %path, error = %source, "pre-cache fetch failed");
                GatewayError::InstallFetch {
                    path: path.clone(),
                    source,
                }
            })?;
            if !response.is_ok() {
                warn!(path = %path, status = response.status, "pre-cache fetch rejected");
                return Err(GatewayError::InstallStatus {
                    path: path.clone(),
                    status: response.status,
                });
            }
            fetched.push((request.cache_key(), response));
        }

        for (key, response) in fetched {
            self.cache.put(&partition, &key, response).await;
        }
        info!(partition = %partition, assets = self.config.static_assets.len(), "static assets cached");
        self.host.skip_waiting().await;
        Ok(())
    }

    /// Drops partitions from other versions and claims open pages.
    /// Returns the names of the deleted partitions.
    pub async fn activate(&self) -> Vec<String> {
        let keep = [
            self.config.static_partition(),
            self.config.dynamic_partition(),
        ];
        let mut deleted = Vec::new();
        for name in self.cache.keys().await {
            if keep.contains(&name) {
                continue;
            }
            info!(partition = %name, "deleting stale cache");
            if self.cache.delete(&name).await {
                deleted.push(name);
            }
        }
        self.host.claim_clients().await;
        info!(version = %self.config.version, "activated");
        deleted
    }

    /// Routes one intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, GatewayError> {
        if request.method != Method::Get || request.url.origin() != self.config.origin.origin() {
            return Ok(FetchOutcome::Passthrough);
        }

        let response = if self.config.is_static(request.url.path()) {
            self.serve_static(request).await?
        } else {
            self.serve_dynamic(request).await?
        };
        Ok(FetchOutcome::Respond(response))
    }

    async fn serve_static(&self, request: &Request) -> Result<Response, GatewayError> {
        let partition = self.config.static_partition();
        let key = request.cache_key();

        if let Some(hit) = self.cache.match_in(&partition, &key).await {
            debug!(url = %key, "serving from cache");
            return Ok(hit);
        }

        debug!(url = %key, "fetching from network");
        match self.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.cache.put(&partition, &key, response.clone()).await;
                }
                Ok(response)
            }
            Err(source) => {
                if request.accepts_html() {
                    if let Some(page) = self.offline_page().await {
                        warn!(url = %key, error = %source, "offline, serving fallback document");
                        return Ok(page);
                    }
                }
                Err(GatewayError::Network { url: key, source })
            }
        }
    }

    async fn offline_page(&self) -> Option<Response> {
        let url = self.config.origin.join(&self.config.offline_document).ok()?;
        self.cache
            .match_in(&self.config.static_partition(), url.as_str())
            .await
    }

    async fn serve_dynamic(&self, request: &Request) -> Result<Response, GatewayError> {
        let key = request.cache_key();

        if let Some(hit) = self.cache.match_any(&key).await {
            debug!(url = %key, "serving from cache");
            return Ok(hit);
        }

        debug!(url = %key, "fetching from network");
        match self.fetch(request).await {
            Ok(response) => {
                if response.is_ok() && response.kind == ResponseKind::Basic {
                    self.cache
                        .put(&self.config.dynamic_partition(), &key, response.clone())
                        .await;
                }
                Ok(response)
            }
            Err(source) => {
                warn!(url = %key, error = %source, "network request failed");
                // A concurrent request may have filled the cache meanwhile.
                self.cache
                    .match_any(&key)
                    .await
                    .ok_or(GatewayError::Network { url: key, source })
            }
        }
    }

    pub async fn handle_message(&self, message: ControlMessage) -> Option<Reply> {
        debug!(?message, "control message");
        match message {
            ControlMessage::SkipWaiting => {
                self.host.skip_waiting().await;
                None
            }
            ControlMessage::GetVersion => Some(Reply::Version(self.config.version_name())),
            ControlMessage::ClearCache => {
                for name in self.cache.keys().await {
                    self.cache.delete(&name).await;
                }
                info!("all caches cleared");
                None
            }
        }
    }

    /// Shows a notification for a push message; an empty payload gets a
    /// generic break reminder.
    pub async fn handle_push(&self, payload: Option<&str>) {
        let body = payload
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(PUSH_FALLBACK_BODY);
        let notification = Notification {
            title: APP_NAME.to_string(),
            body: body.to_string(),
            icon: PUSH_ICON.to_string(),
            tag: NOTIFICATION_TAG.to_string(),
        };
        self.host.show_notification(&notification).await;
    }

    pub async fn handle_notification_click(&self, action: Option<&str>) {
        match ClickAction::from_action(action) {
            ClickAction::Close => {}
            ClickAction::Explore => self.host.open_window(APP_ROOT).await,
            ClickAction::Default => {
                let root = self.config.origin.join(APP_ROOT).ok();
                for client in self.host.clients().await {
                    let at_root = client.url == APP_ROOT
                        || root.as_ref().is_some_and(|root| client.url == root.as_str());
                    if at_root && client.focusable && self.host.focus(&client).await {
                        return;
                    }
                }
                self.host.open_window(APP_ROOT).await;
            }
        }
    }
}
