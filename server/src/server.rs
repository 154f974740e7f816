//! Server lifecycle: owns the ledger and serves the HTTP API.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use zkbank_common::{Result, ZkBankError};
use zkbank_ledger::TransactionLedger;

use crate::api::{build_router, AppState};
use crate::config::ServerConfig;
use crate::metrics::{Metrics, SharedMetrics};
use crate::state::ServerState;

/// The zkBank API server.
pub struct Server {
    /// Configuration.
    config: ServerConfig,
    /// Node ID for this server instance.
    node_id: String,
    /// Current server state.
    state: Arc<RwLock<ServerState>>,
    /// Transaction ledger.
    ledger: Arc<TransactionLedger>,
    /// Request and workflow counters.
    metrics: SharedMetrics,
    /// Shutdown signal.
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    /// Create a server with an in-memory ledger built from the configuration.
    pub fn new(config: ServerConfig, node_id: String) -> Self {
        let ledger = Arc::new(TransactionLedger::in_memory(config.ledger.clone()));
        Self::with_ledger(config, node_id, ledger)
    }

    /// Create a server around an existing ledger.
    pub fn with_ledger(config: ServerConfig, node_id: String, ledger: Arc<TransactionLedger>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            node_id,
            state: Arc::new(RwLock::new(ServerState::Starting)),
            ledger,
            metrics: Arc::new(Metrics::new()),
            shutdown_tx,
        }
    }

    /// Mark the server as running. Requests are refused until this is called.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn start(&self) {
        *self.state.write() = ServerState::Running;
        info!(network = %self.config.network, "Server started");
    }

    /// Begin graceful shutdown.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn stop(&self) {
        let mut state = self.state.write();
        if state.is_terminal() {
            return;
        }
        *state = ServerState::ShuttingDown;
        drop(state);

        info!("Stopping server");
        self.shutdown_tx.send_replace(true);
    }

    /// Build the router over this server's state.
    pub fn router(&self) -> axum::Router {
        let app = AppState {
            ledger: self.ledger.clone(),
            metrics: self.metrics.clone(),
            state: self.state.clone(),
            network: self.config.network.clone(),
            node_id: self.node_id.clone(),
        };
        build_router(app, &self.config)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self
            .config
            .socket_addr()
            .map_err(ZkBankError::Configuration)?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| ZkBankError::Network(format!("Failed to bind {}: {}", addr, e)))
    }

    /// Serve on `listener` until `shutdown` resolves or `stop` is called.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ZkBankError::Network(e.to_string()))?;

        let mut stop_rx = self.shutdown_tx.subscribe();
        let signal = async move {
            tokio::select! {
                _ = shutdown => {}
                _ = stop_rx.wait_for(|stopped| *stopped) => {}
            }
        };

        if *self.shutdown_tx.borrow() {
            warn!(node_id = %self.node_id, "Shutdown requested before serving");
        } else {
            self.start();
        }
        info!(node_id = %self.node_id, addr = %local_addr, "Listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ZkBankError::Network(e.to_string()));

        *self.state.write() = ServerState::Stopped;
        info!(node_id = %self.node_id, "Server stopped");
        result
    }

    /// Get current server state.
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    /// Check if server is accepting requests.
    pub fn is_accepting_requests(&self) -> bool {
        self.state.read().accepts_requests()
    }

    /// Get node ID.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Get the ledger.
    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }

    /// Get the metrics.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }
}
