//! # Server module - HTTP side of the broadcaster
//!
//! Thin layer over Axum:
//!
//! - 📁 **Audio files**: the catalog is served as is with `add_audio_dir()`
//! - 🚀 **JSON routes**: diagnostic endpoints with `add_route()`
//! - 📜 **Logs**: SSE stream, dump and level setup with `init_logging_routes()`
//! - ℹ️ **`/info`**: name, advertised host and port, always present
//!
//! The audio tree is mounted at the root, so a file `fajr/a.mp3` under the
//! audio directory is fetched by speakers as `http://<host>:<port>/fajr/a.mp3`.

use crate::logs::{LogState, log_dump, log_setup_get, log_setup_post, log_sse};
use anyhow::{Context, Result};
use athanconfig::Config;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{sync::RwLock, task::JoinHandle};
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Serializable server info
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
    pub audio_dir: Option<String>,
}

/// Audio and diagnostics HTTP server
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    audio_dir: Option<PathBuf>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Creates a server, not yet listening
    ///
    /// # Arguments
    ///
    /// * `name` - Server name (for the logs)
    /// * `base_url` - host advertised to the speakers (e.g. "192.168.1.10")
    /// * `http_port` - HTTP port to listen on, 0 for any free port
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            audio_dir: None,
            join_handle: None,
        }
    }

    /// Server on `host.http_port`, advertising `host.base_url`, serving `host.audio_dir`
    pub fn from_config(name: impl Into<String>, config: &Config) -> Self {
        let mut server = Self::new(name, config.get_base_url(), config.get_http_port());
        server.audio_dir = Some(PathBuf::from(config.get_audio_dir()));
        server
    }

    /// Serves the audio directory at the root
    ///
    /// Replaces any previously configured directory.
    pub fn add_audio_dir(&mut self, dir: impl Into<PathBuf>) {
        self.audio_dir = Some(dir.into());
    }

    /// Adds a dynamic JSON route
    ///
    /// The closure is called on every GET to `path`.
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).route(path, get(handler));
    }

    /// Adds `/log-dump`, `/log-sse` and `/log-setup`
    pub async fn init_logging_routes(&mut self, log_state: LogState) {
        let routes = Router::new()
            .route("/log-sse", get(log_sse))
            .route("/log-dump", get(log_dump))
            .route("/log-setup", get(log_setup_get).post(log_setup_post))
            .with_state(log_state);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(routes);
    }

    /// Complete router: registered routes, `/info`, then the audio tree as fallback
    pub async fn router(&self) -> Router {
        let info = self.info();
        let mut router = self
            .router
            .read()
            .await
            .clone()
            .route("/info", get(move || async move { Json(info) }));

        if let Some(dir) = &self.audio_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }
        router
    }

    /// Binds the listener and serves in the background
    ///
    /// Returns the bound address. A bind failure is returned to the caller;
    /// stopping is left to [`Server::stop`].
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding HTTP server on {}", addr))?;
        let local = listener.local_addr()?;
        self.http_port = local.port();

        let router = self.router().await;
        info!(
            "🌐 Server {} running at http://{}:{}",
            self.name, self.base_url, self.http_port
        );
        if let Some(dir) = &self.audio_dir {
            info!("📁 Serving audio from {}", dir.display());
        }

        let name = self.name.clone();
        self.join_handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service()).await {
                error!("❌ Server {} stopped: {}", name, e);
            }
        }));

        Ok(local)
    }

    /// Stops serving
    pub fn stop(&mut self) {
        if let Some(h) = self.join_handle.take() {
            h.abort();
            info!("🛑 Server {} stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
            audio_dir: self
                .audio_dir
                .as_ref()
                .map(|d| d.to_string_lossy().to_string()),
        }
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(h) = self.join_handle.take() {
            h.abort();
        }
    }
}
