//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use qflask::{App, Server, Shutdown};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port.
///
/// The listener is bound before returning, so requests can be sent at once.
pub async fn spawn_app(app: App) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = Server::with_address(Arc::new(app), "127.0.0.1", addr.port());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// A client that bypasses any system proxy and never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
