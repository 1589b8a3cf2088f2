//! TCP transport for HTTP requests.
//!
//! Accepts one connection at a time: read the request, resolve, write the
//! response, close. The next connection is accepted only after the current
//! one is finished, so a silent client holds the server until it goes away.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::handler::{Handled, Handler};
use crate::http::{Response, Status};
use crate::resolver::Resolve;
use crate::stats::Stats;

use super::{MAX_REQUEST_SIZE, log_request};

/// Pending connections the kernel queues while one is being served.
const LISTEN_BACKLOG: i32 = 3;

/// TCP transport for the gateway.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a TCP listener with address and port reuse enabled.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;
        socket.set_nonblocking(true)?;

        let listener = TcpListener::from_std(socket.into())?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve connections sequentially until `shutdown` completes.
    ///
    /// `shutdown` is only observed between connections. An accept error is
    /// fatal and returned to the caller; the listener is dropped either way.
    pub async fn serve<R, F>(
        self,
        handler: Handler<R>,
        stats: &Stats,
        shutdown: F,
    ) -> io::Result<()>
    where
        R: Resolve,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (client, peer) = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested, closing listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };

            handle_connection(client, peer, &handler, stats).await;
        }
    }
}

/// Handle a single connection: read request, dispatch, write response.
async fn handle_connection<R: Resolve>(
    mut client: TcpStream,
    peer: SocketAddr,
    handler: &Handler<R>,
    stats: &Stats,
) {
    let request = match read_request(&mut client).await {
        Ok(r) => r,
        Err(e) => {
            warn!(%peer, error = %e, "failed to read request");
            return;
        }
    };

    let start_time = Instant::now();
    let handled = dispatch(handler, request).await;
    let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if let Err(e) = write_response(&mut client, &handled.response).await {
        warn!(%peer, error = %e, "failed to write response");
    }

    stats.record(handled.response.status, elapsed_ms);
    log_request(peer, &handled, elapsed_ms);
}

/// Run the handler on the blocking pool; resolver calls block.
async fn dispatch<R: Resolve>(handler: &Handler<R>, request: Vec<u8>) -> Handled {
    let handler = handler.clone();

    match tokio::task::spawn_blocking(move || handler.handle(&request)).await {
        Ok(handled) => handled,
        Err(e) => {
            warn!(error = %e, "request handler panicked");
            Handled {
                method: String::new(),
                path: String::new(),
                response: Response::empty(Status::ServerError),
            }
        }
    }
}

/// Read a request with a single read call of at most `MAX_REQUEST_SIZE` bytes.
async fn read_request(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_REQUEST_SIZE];
    let n = stream.read(&mut buf).await?;
    buf.truncate(n);

    Ok(buf)
}

/// Write the whole response and close our side of the connection.
async fn write_response(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await
}
