//! Web server for drivegate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::archive::ArchiveOptions;
use crate::config::{Config, WebConfig};
use crate::drive::DriveSource;
use crate::registry::Registry;
use crate::{GateError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_static_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(addr: SocketAddr, app_state: Arc<AppState>, web_config: WebConfig) -> Self {
        Self {
            addr,
            app_state,
            web_config,
        }
    }

    /// Create a web server from the application configuration.
    pub fn from_config(
        config: &Config,
        registry: Arc<Registry>,
        drive: Arc<dyn DriveSource>,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| GateError::Config(format!("invalid server address: {e}")))?;
        let app_state = AppState::new(registry, drive, ArchiveOptions::from(&config.archive));
        Ok(Self::new(addr, Arc::new(app_state), config.web.clone()))
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_router(self) -> (SocketAddr, Router) {
        let mut router = create_router(self.app_state, &self.web_config.cors_origins)
            .merge(create_health_router());

        // Add static file serving if enabled
        if self.web_config.serve_static {
            if let Some(static_router) = create_static_router(&self.web_config.static_path) {
                router = router.merge(static_router);
            }
        }

        (self.addr, router)
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let (addr, router) = self.into_router();
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (addr, router) = self.into_router();
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
