//! Transport layer for the gateway.
//!
//! Owns the listening socket and moves bytes between clients and the
//! request handler. Only TCP is served.

pub mod tcp;

use std::net::SocketAddr;

use tracing::info;

use crate::handler::Handled;

/// Longest request accepted, in bytes. A request is read with a single
/// read call; anything past this limit is never seen.
pub const MAX_REQUEST_SIZE: usize = 8192;

/// Log one served request.
pub fn log_request(peer: SocketAddr, handled: &Handled, elapsed_ms: f64) {
    info!(
        %peer,
        method = %handled.method,
        path = %handled.path,
        status = handled.response.status.code(),
        body_len = handled.response.body.len(),
        elapsed_ms,
        "request served"
    );
}
