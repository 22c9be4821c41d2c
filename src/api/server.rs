//! Proxy server lifecycle: bind, spawn a background task, hand back a
//! handle with a shutdown channel.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::proxy_router;
use crate::config::ProxyConfig;

/// Where and since when a proxy is serving.
#[derive(Debug, Clone, Serialize)]
pub struct ProxySession {
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running proxy server.
pub struct ProxyServer {
    pub session: ProxySession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ProxyServer {
    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Proxy server shutdown signal sent");
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Proxy server task failed: {e}");
            }
        }
    }
}

/// Start the proxy on `config.bind_addr`.
pub async fn start_proxy_server(config: &ProxyConfig) -> Result<ProxyServer, String> {
    start_proxy_server_on(config, config.bind_addr).await
}

/// Start the proxy on a specific address (port 0 picks an ephemeral port).
pub async fn start_proxy_server_on(
    config: &ProxyConfig,
    bind_addr: SocketAddr,
) -> Result<ProxyServer, String> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("Failed to bind proxy server: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = proxy_router(config).map_err(|e| e.to_string())?;

    let session = ProxySession {
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Proxy server received shutdown signal");
        };

        tracing::info!(%addr, "Proxy server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Proxy server error: {e}");
        }

        tracing::info!("Proxy server stopped");
    });

    Ok(ProxyServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    async fn start_local() -> ProxyServer {
        start_proxy_server_on(
            &ProxyConfig::default(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        )
        .await
        .expect("server should start")
    }

    #[tokio::test]
    async fn serves_health_over_http() {
        let server = start_local().await;
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/api/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        server.stop().await;
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = start_local().await;
        let url = format!("http://127.0.0.1:{}/nonexistent", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        server.stop().await;
    }

    #[tokio::test]
    async fn stopped_server_refuses_connections() {
        let server = start_local().await;
        let port = server.session.port;
        server.stop().await;

        let url = format!("http://127.0.0.1:{port}/api/health");
        assert!(reqwest::get(&url).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_local().await;
        server.shutdown();
        server.shutdown();
        server.stop().await;
    }
}
