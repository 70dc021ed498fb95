//! Webhook HTTP(S) server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use kfserving_common::{Error, Result};

/// How long in-flight admission requests get to finish on shutdown
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// PEM files for the serving certificate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsPaths {
    /// Certificate chain
    pub cert: PathBuf,
    /// Private key
    pub key: PathBuf,
}

/// Listener configuration for the webhook server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: SocketAddr,
    /// TLS material; plain HTTP when `None`
    pub tls: Option<TlsPaths>,
}

impl ServerConfig {
    /// Build a config from optional cert and key paths
    ///
    /// Both or neither must be set.
    pub fn new(addr: SocketAddr, cert: Option<PathBuf>, key: Option<PathBuf>) -> Result<Self> {
        let tls = match (cert, key) {
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::config(
                    "tls-key",
                    "--tls-cert was given without --tls-key",
                ))
            }
            (None, Some(_)) => {
                return Err(Error::config(
                    "tls-cert",
                    "--tls-key was given without --tls-cert",
                ))
            }
        };
        Ok(Self { addr, tls })
    }
}

/// Serve `app` until `shutdown` resolves
pub async fn serve(
    config: ServerConfig,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    match config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(|e| Error::config("tls", format!("TLS config error: {e}")))?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown.await;
                shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
            });

            info!(addr = %config.addr, cert = %tls.cert.display(), "Starting webhook server (TLS)");
            axum_server::bind_rustls(config.addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| Error::internal_with_context("webhook server", e.to_string()))
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.addr)
                .await
                .map_err(|e| {
                    Error::config("listen-addr", format!("failed to bind {}: {e}", config.addr))
                })?;

            info!(addr = %config.addr, "Starting webhook server (plain HTTP)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(|e| Error::internal_with_context("webhook server", e.to_string()))
        }
    }
}
