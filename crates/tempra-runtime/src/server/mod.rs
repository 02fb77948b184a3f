//! HTTP binding of the directive queue
//!
//! | Method | Path | |
//! |---|---|---|
//! | `POST` | `/api/token` | create token |
//! | `DELETE` | `/api/token/:token` | hard reset |
//! | `POST` | `/api/data/:token` | push |
//! | `GET` | `/api/data/:token` | poll |
//! | `POST` | `/api/ack/:token` | ack |
//! | `GET` | `/api/status` | counts and uptime |
//! | `GET` | `/health` | liveness |

mod error;
mod handlers;
mod router;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use tempra_core::{TempraError, TempraResult};
use tokio::net::TcpListener;
use tracing::info;

use crate::ServerConfig;

/// Queue server
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Server { config, state }
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> TempraResult<()> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| TempraError::Config(format!("bind {}: {}", self.config.listen_addr, e)))?;
        serve(listener, self.state, self.config.enable_cors, shutdown_signal()).await
    }
}

/// Serve on an already-bound listener until `shutdown` completes
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    enable_cors: bool,
    shutdown: F,
) -> TempraResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(?addr, "tempra queue server listening");

    axum::serve(listener, create_router(state, enable_cors))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TempraError::TransportError(e.to_string()))?;

    info!("tempra queue server stopped");
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}
