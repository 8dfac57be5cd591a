//! Edge server owning both listener lifecycles.
//!
//! The plaintext listener binds at `start` and runs for the life of the
//! process. The encrypted listener binds only once a certificate pair is
//! supplied to `start_encrypted`; that certificate is fixed for the
//! listener's lifetime, and replacing it means starting a new listener.
//!
//! Only bind and certificate errors are reported to the caller. Anything
//! that goes wrong after a listener is bound is logged and absorbed, since
//! by then the start call has already returned.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::challenge::ChallengeStore;
use crate::config::SHUTDOWN_GRACE_SECS;

use super::routes::build_router;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("Failed to load TLS certificate pair: {0}")]
    TlsConfig(String),
}

/// The dual-listener HTTP front end.
///
/// Owns the challenge store shared by both listeners and the graceful
/// shutdown handles for each. Instances are independent, so a test suite can
/// run several servers side by side on ephemeral ports.
pub struct EdgeServer {
    store: ChallengeStore,
    http_addr: SocketAddr,
    https_addr: SocketAddr,
    http_handle: Handle,
    https_handle: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EdgeServer {
    /// Creates a server for the given listener addresses. Nothing is bound
    /// until `start` / `start_encrypted` are called.
    pub fn new(http_addr: SocketAddr, https_addr: SocketAddr) -> Self {
        Self {
            store: ChallengeStore::new(),
            http_addr,
            https_addr,
            http_handle: Handle::new(),
            https_handle: Handle::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Starts the plaintext listener.
    ///
    /// Binds synchronously so the caller sees bind failures, then serves in a
    /// background task. Returns the bound address (useful when binding port 0).
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let listener = bind(self.http_addr)?;
        let addr = listener.local_addr()?;

        tracing::info!(%addr, "Starting plaintext listener");

        let app = build_router(self.store.clone());
        let handle = self.http_handle.clone();
        let task = tokio::spawn(async move {
            match axum_server::from_tcp(listener)
                .handle(handle)
                .serve(app.into_make_service())
                .await
            {
                Ok(()) => tracing::debug!(%addr, "Plaintext listener stopped"),
                Err(e) => tracing::error!(error = %e, %addr, "Plaintext listener failed"),
            }
        });
        self.tasks.lock().await.push(task);

        Ok(addr)
    }

    /// Starts the encrypted listener with the supplied PEM certificate pair.
    ///
    /// Fails without binding anything if the certificate or key cannot be
    /// parsed or do not match each other. On success the listener always
    /// presents this one certificate regardless of the requested server name,
    /// with TLS 1.2 as the minimum protocol version.
    pub async fn start_encrypted(
        &self,
        cert_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<SocketAddr, ServerError> {
        let tls = build_tls_config(cert_pem, key_pem)?;
        let listener = bind(self.https_addr)?;
        let addr = listener.local_addr()?;

        tracing::info!(%addr, "Starting encrypted listener");

        let config = RustlsConfig::from_config(Arc::new(tls));
        let app = build_router(self.store.clone());
        let handle = self.https_handle.clone();
        let task = tokio::spawn(async move {
            match axum_server::from_tcp_rustls(listener, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
            {
                Ok(()) => tracing::debug!(%addr, "Encrypted listener stopped"),
                Err(e) => tracing::error!(error = %e, %addr, "Encrypted listener failed"),
            }
        });
        self.tasks.lock().await.push(task);

        Ok(addr)
    }

    /// Registers a challenge token with its expected key authorization.
    /// Called by the external ACME client as it begins a validation exchange.
    pub async fn register_token(&self, token: impl Into<String>, response: impl Into<String>) {
        self.store.put(token, response).await;
    }

    /// Removes all outstanding challenge tokens. Called when a validation
    /// round completes so stale tokens stop being servable.
    pub async fn clear_tokens(&self) {
        self.store.clear().await;
    }

    /// Returns a handle to the shared challenge store.
    pub fn challenge_store(&self) -> ChallengeStore {
        self.store.clone()
    }

    /// Drains both listeners and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        let grace = Duration::from_secs(SHUTDOWN_GRACE_SECS);

        tracing::info!(grace_secs = SHUTDOWN_GRACE_SECS, "Draining listeners");
        self.http_handle.graceful_shutdown(Some(grace));
        self.https_handle.graceful_shutdown(Some(grace));

        for task in self.tasks.lock().await.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Listener task failed during shutdown");
            }
        }
    }
}

/// Binds a listener synchronously so the caller sees bind errors.
fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Builds a rustls config presenting the single supplied certificate.
fn build_tls_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<rustls::ServerConfig, ServerError> {
    let certs = rustls_pemfile::certs(&mut &*cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::TlsConfig(format!("Failed to parse certificate: {e}")))?;
    if certs.is_empty() {
        return Err(ServerError::TlsConfig(
            "No certificates found in PEM input".to_string(),
        ));
    }

    let key = rustls_pemfile::private_key(&mut &*key_pem)
        .map_err(|e| ServerError::TlsConfig(format!("Failed to parse private key: {e}")))?
        .ok_or_else(|| ServerError::TlsConfig("No private key found in PEM input".to_string()))?;

    // One wildcard certificate answers for every requested server name, so a
    // constant certificate stands in for a per-hostname resolver.
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|e| ServerError::TlsConfig(format!("Unsupported protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::TlsConfig(format!("Certificate and key do not match: {e}")))?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}
