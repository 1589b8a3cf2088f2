//! Gateway orchestration.
//!
//! Binds the listener and runs the serve loop until Ctrl-C.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tracing::{error, info};

use crate::handler::Handler;
use crate::resolver::{Resolve, SystemResolver};
use crate::stats::Stats;
use crate::transport::tcp::TcpTransport;

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Listen on every IPv4 interface at `port`.
    pub fn all_interfaces(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

/// A bound, not yet serving, gateway.
pub struct Server {
    transport: TcpTransport,
    stats: Stats,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let transport = TcpTransport::bind(config.bind_addr).await?;

        Ok(Self {
            transport,
            stats: Stats::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Serve until `shutdown` completes or accepting fails.
    pub async fn serve<R, F>(self, resolver: Arc<R>, shutdown: F) -> io::Result<()>
    where
        R: Resolve,
        F: Future<Output = ()>,
    {
        let handler = Handler::new(resolver);
        let result = self.transport.serve(handler, &self.stats, shutdown).await;

        let stats = self.stats.snapshot();
        info!(
            requests = stats.requests,
            ok = stats.ok,
            bad_request = stats.bad_request,
            not_found = stats.not_found,
            method_not_allowed = stats.method_not_allowed,
            server_error = stats.server_error,
            avg_response_ms = stats.avg_response_ms,
            "gateway stopped"
        );

        result
    }
}

/// Run the gateway with the system resolver until Ctrl-C.
pub async fn run(config: ServerConfig) -> io::Result<()> {
    let server = Server::bind(&config).await.inspect_err(|e| {
        error!(addr = %config.bind_addr, error = %e, "failed to bind listener");
    })?;

    info!(addr = %server.local_addr()?, "DNS gateway listening");

    server
        .serve(Arc::new(SystemResolver::new()), shutdown_signal())
        .await
        .inspect_err(|e| error!(error = %e, "accept failed, shutting down"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
