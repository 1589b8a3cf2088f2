//! dnsgate - a minimal HTTP/1.1 gateway to the system DNS resolver.
//!
//! Clients ask for A, AAAA and PTR lookups with
//! `GET /resolve?name=<NAME>&type=<TYPE>` or with a `POST /dns-query` body of
//! `name:type` lines, and get back `name:type=value` lines in plain text.

pub mod error;
pub mod handler;
pub mod http;
pub mod query;
pub mod resolver;
pub mod server;
pub mod stats;
pub mod transport;
