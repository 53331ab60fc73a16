//! Web server lifecycle
//!
//! Owns the listening socket and the stopped/running state machine. The
//! state lock is only held while starting or stopping; request handling
//! never touches it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::assets::{AssetBundle, WebAssets};
use super::error::ServerError;
use super::{build_router, ApiState};
use crate::config::ConfigAccessor;
use crate::sessions::SessionRegistry;

/// Default web UI port
pub const DEFAULT_SERVER_PORT: u16 = 9123;

/// How long `stop` waits for in-flight requests by default
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum ServerState {
    Stopped,
    Running(RunningServer),
}

struct RunningServer {
    local_addr: SocketAddr,
    /// Taken on the first stop attempt
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Embedded HTTP server for the configuration UI.
///
/// Dropping a running server closes its listener and lets in-flight
/// requests finish in the background.
pub struct WebServer {
    port: u16,
    config: Arc<dyn ConfigAccessor>,
    sessions: Arc<dyn SessionRegistry>,
    assets: Arc<dyn AssetBundle>,
    shutdown_timeout: Duration,
    state: Mutex<ServerState>,
}

impl WebServer {
    /// Create a stopped server on the default port serving the embedded UI
    pub fn new(config: Arc<dyn ConfigAccessor>, sessions: Arc<dyn SessionRegistry>) -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            config,
            sessions,
            assets: Arc::new(WebAssets),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
            state: Mutex::new(ServerState::Stopped),
        }
    }

    /// Listen on another port (0 picks a free one)
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serve a different static bundle
    pub fn with_assets(mut self, assets: Arc<dyn AssetBundle>) -> Self {
        self.assets = assets;
        self
    }

    /// Bound the wait for in-flight requests in `stop`
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// URL of the web UI. Derived from the configured port only; it says
    /// nothing about whether the server is reachable.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Bind the listener and start serving in the background
    pub async fn start(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().await;

        if matches!(*state, ServerState::Running(_)) {
            return Err(ServerError::AlreadyRunning);
        }

        let router = build_router(Arc::new(ApiState {
            config: Arc::clone(&self.config),
            sessions: Arc::clone(&self.sessions),
            assets: Arc::clone(&self.assets),
            web_url: self.url(),
        }));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let bind_error = |source| ServerError::Bind {
            port: self.port,
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            // A dropped sender also counts as a shutdown request
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Server error: {}", e);
            }
        });

        *state = ServerState::Running(RunningServer {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        });

        info!("Web server started on port {}: {}", local_addr.port(), self.url());
        Ok(())
    }

    /// Gracefully stop serving. Stopping a stopped server is a no-op
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().await;

        let outcome = {
            let ServerState::Running(running) = &mut *state else {
                return Ok(());
            };
            if let Some(tx) = running.shutdown_tx.take() {
                let _ = tx.send(());
            }
            tokio::time::timeout(self.shutdown_timeout, &mut running.task).await
        };

        match outcome {
            Ok(Ok(())) => {
                *state = ServerState::Stopped;
                info!("Web server stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                // The serving task is gone either way
                *state = ServerState::Stopped;
                Err(ServerError::Shutdown(format!("serving task failed: {}", e)))
            }
            Err(_) => Err(ServerError::Shutdown(format!(
                "in-flight requests still running after {:?}",
                self.shutdown_timeout
            ))),
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, ServerState::Running(_))
    }

    /// Address actually bound while running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock().await {
            ServerState::Running(running) => Some(running.local_addr),
            ServerState::Stopped => None,
        }
    }
}
