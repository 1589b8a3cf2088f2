//! End-to-end tests against a real listener on loopback.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use dnsgate::resolver::{Resolve, ResolveError, SystemResolver};
use dnsgate::server::{Server, ServerConfig};
use dnsgate::transport::MAX_REQUEST_SIZE;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Fixed;

impl Resolve for Fixed {
    fn resolve_a(&self, name: &str) -> Result<Ipv4Addr, ResolveError> {
        match name {
            "gateway.test" => Ok(Ipv4Addr::new(192, 0, 2, 10)),
            "flaky.test" => Err(ResolveError::Failed("Temporary failure".into())),
            _ => Err(ResolveError::NotFound),
        }
    }

    fn resolve_aaaa(&self, name: &str) -> Result<Ipv6Addr, ResolveError> {
        match name {
            "gateway.test" => Ok("2001:db8::10".parse().unwrap()),
            _ => Err(ResolveError::NotFound),
        }
    }

    fn resolve_ptr(&self, address: &str) -> Result<String, ResolveError> {
        match address {
            "192.0.2.10" => Ok("gateway.test".to_string()),
            _ => Err(ResolveError::NotFound),
        }
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

async fn start<R: Resolve>(resolver: R) -> Running {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };
    let server = Server::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let task = tokio::spawn(server.serve(Arc::new(resolver), async move {
        let _ = stopped.await;
    }));

    Running { addr, stop, task }
}

/// Send one raw request and split the reply into (status line, headers, body).
async fn send(addr: SocketAddr, request: &str) -> (String, Vec<String>, String) {
    let exchange = async {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        // Bytes past the server's read limit are never read, so the close
        // can arrive as a reset once the response is in.
        let mut reply = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => reply.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::ConnectionReset && !reply.is_empty() => break,
                Err(e) => panic!("read failed: {e}"),
            }
        }
        String::from_utf8(reply).unwrap()
    };
    let reply = tokio::time::timeout(TIMEOUT, exchange).await.unwrap();

    let (head, body) = reply.split_once("\r\n\r\n").unwrap();
    let mut lines = head.split("\r\n").map(str::to_string);
    let status = lines.next().unwrap();

    (status, lines.collect(), body.to_string())
}

#[tokio::test]
async fn get_returns_result_line() {
    let server = start(Fixed).await;

    let (status, headers, body) = send(
        server.addr,
        "GET /resolve?name=gateway.test&type=A HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(
        headers,
        vec![
            "Content-Length: 26",
            "Content-Type: text/plain;charset=utf-8",
            "Connection: Closed",
        ]
    );
    assert_eq!(body, "gateway.test:A=192.0.2.10\n");
}

#[tokio::test]
async fn post_returns_one_line_per_query() {
    let server = start(Fixed).await;

    let (status, _, body) = send(
        server.addr,
        "POST /dns-query HTTP/1.1\r\nHost: x\r\n\r\ngateway.test:A\ngateway.test:AAAA\n192.0.2.10:PTR\n",
    )
    .await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(
        body,
        "gateway.test:A=192.0.2.10\ngateway.test:AAAA=2001:db8::10\n192.0.2.10:PTR=gateway.test\n"
    );
}

#[tokio::test]
async fn error_statuses_have_empty_bodies() {
    let server = start(Fixed).await;

    let cases = [
        ("GET /resolve?name=missing.test&type=A HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        ("GET /resolve?name=gateway.test&type=BOGUS HTTP/1.1\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        ("GET /nonsense HTTP/1.1\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        ("POST /dns-query HTTP/1.1\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        ("POST /other HTTP/1.1\r\n\r\ngateway.test:A\n", "HTTP/1.1 400 Bad Request"),
        ("PUT /dns-query HTTP/1.1\r\n\r\n", "HTTP/1.1 405 Method Not Allowed"),
        ("GET /resolve?name=gateway.test&type=A HTTP/2\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        ("GET /resolve?name=flaky.test&type=A HTTP/1.1\r\n\r\n", "HTTP/1.1 500 Server Error"),
    ];

    for (request, expected) in cases {
        let (status, headers, body) = send(server.addr, request).await;

        assert_eq!(status, expected, "request: {request:?}");
        assert_eq!(headers[0], "Content-Length: 0");
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let server = start(Fixed).await;
    let request = "GET /resolve?name=gateway.test&type=AAAA HTTP/1.1\r\n\r\n";

    let first = send(server.addr, request).await;
    let second = send(server.addr, request).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn queued_clients_are_all_served() {
    let server = start(Fixed).await;

    let clients = (0..3).map(|_| {
        send(
            server.addr,
            "GET /resolve?name=192.0.2.10&type=PTR HTTP/1.1\r\n\r\n",
        )
    });
    let replies = futures::future::join_all(clients).await;

    for (status, _, body) in replies {
        assert_eq!(status, "HTTP/1.1 200 OK");
        assert_eq!(body, "192.0.2.10:PTR=gateway.test\n");
    }
}

/// POST whose first `MAX_REQUEST_SIZE` bytes end on a query line boundary,
/// followed by `tail_lines` more queries.
fn oversized_post(head_lines: usize, tail_lines: usize) -> String {
    let query = "gateway.test:A\n";
    let mut request = String::from("POST /dns-query HTTP/1.1\r\nX-Pad: ");
    let fixed = request.len() + "\r\n\r\n".len() + head_lines * query.len();

    request.push_str(&"p".repeat(MAX_REQUEST_SIZE - fixed));
    request.push_str("\r\n\r\n");
    request.push_str(&query.repeat(head_lines));
    assert_eq!(request.len(), MAX_REQUEST_SIZE);

    request.push_str(&"missing.test:A\n".repeat(tail_lines));
    request
}

#[tokio::test]
async fn request_is_cut_at_read_limit() {
    let server = start(Fixed).await;

    let (status, _, body) = send(server.addr, &oversized_post(4, 100)).await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(body, "gateway.test:A=192.0.2.10\n".repeat(4));

    let (status, _, body) = send(
        server.addr,
        "GET /resolve?name=gateway.test&type=A HTTP/1.1\r\n\r\n",
    )
    .await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(body, "gateway.test:A=192.0.2.10\n");
}

#[tokio::test]
async fn request_of_exactly_read_limit_is_whole() {
    let server = start(Fixed).await;

    let (status, _, body) = send(server.addr, &oversized_post(4, 0)).await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(body, "gateway.test:A=192.0.2.10\n".repeat(4));
}

#[tokio::test]
async fn shutdown_stops_serving() {
    let server = start(Fixed).await;
    send(server.addr, "GET /nonsense HTTP/1.1\r\n\r\n").await;

    server.stop.send(()).unwrap();
    let result = tokio::time::timeout(TIMEOUT, server.task).await.unwrap().unwrap();

    assert!(result.is_ok());
    assert!(TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn system_resolver_serves_localhost() {
    let server = start(SystemResolver::new()).await;

    let (status, _, body) = send(
        server.addr,
        "POST /dns-query HTTP/1.1\r\n\r\nlocalhost:A\n",
    )
    .await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    let addr = body
        .strip_prefix("localhost:A=")
        .and_then(|rest| rest.strip_suffix('\n'))
        .unwrap();
    assert!(addr.parse::<Ipv4Addr>().is_ok());
}
