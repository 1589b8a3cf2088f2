//! Request interpreters.
//!
//! Turns a raw request into a response: parse the request line, pick the
//! GET or POST interpreter by method, resolve every query, assemble the
//! body. Errors stop at this boundary and become status codes.

use std::sync::Arc;

use crate::error::GatewayError;
use crate::http::{Method, RequestLine, Response, Status, split_request};
use crate::query::{parse_get_path, parse_query_line};
use crate::resolver::Resolve;

const POST_PATH: &str = "/dns-query";
const BODY_SEPARATOR: &str = "\r";

/// Outcome of one request, with enough context for logging.
#[derive(Debug, Clone)]
pub struct Handled {
    pub method: String,
    pub path: String,
    pub response: Response,
}

/// Dispatches requests to the GET and POST interpreters.
pub struct Handler<R> {
    resolver: Arc<R>,
}

impl<R> Clone for Handler<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<R: Resolve> Handler<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self { resolver }
    }

    /// Handle one raw request as read from the socket.
    pub fn handle(&self, raw: &[u8]) -> Handled {
        let (first, rest) = split_request(raw);

        let request_line = match RequestLine::parse(&first) {
            Ok(line) => line,
            Err(e) => {
                return Handled {
                    method: String::new(),
                    path: String::new(),
                    response: Response::empty(e.status()),
                };
            }
        };

        let result = match &request_line.method {
            Method::Get => self.get(&request_line.path),
            Method::Post => self.post(&request_line.path, &rest),
            Method::Other(method) => Err(GatewayError::MethodNotAllowed(method.clone())),
        };

        Handled {
            method: request_line.method.as_str().to_string(),
            path: request_line.path,
            response: into_response(result),
        }
    }

    /// GET interpreter: one query in the path, one result line.
    pub fn get(&self, path: &str) -> Result<String, GatewayError> {
        let query = parse_get_path(path)?;
        let resolution = self.resolver.resolve(&query)?;

        Ok(format!("{resolution}\n"))
    }

    /// POST interpreter: one query per line after the `\r` separator.
    ///
    /// Lines before the separator are skipped. The first failing line aborts
    /// the whole request; no partial results are returned.
    pub fn post(&self, path: &str, lines: &[String]) -> Result<String, GatewayError> {
        if path != POST_PATH {
            return Err(GatewayError::BadRequest("unknown POST path"));
        }

        let queries = lines
            .iter()
            .skip_while(|line| line.as_str() != BODY_SEPARATOR)
            .skip(1);

        let mut body = String::new();
        for line in queries {
            let query = parse_query_line(line)?;
            let resolution = self.resolver.resolve(&query)?;
            body.push_str(&resolution.to_string());
            body.push('\n');
        }

        if body.is_empty() {
            return Err(GatewayError::BadRequest("no queries"));
        }

        Ok(body)
    }
}

fn into_response(result: Result<String, GatewayError>) -> Response {
    match result {
        Ok(body) => Response::new(Status::Ok, body),
        Err(e) => Response::empty(e.status()),
    }
}
