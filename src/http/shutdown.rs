//! Graceful shutdown signal handling.
//!
//! SIGTERM/SIGINT resolve the future returned by [`shutdown_signal`]; the
//! caller then drains the listeners via `EdgeServer::shutdown`, which stops
//! accepting new connections and waits for in-flight ones to complete.

/// Resolves when SIGTERM or Ctrl+C is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
