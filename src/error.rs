//! Request-level error taxonomy.
//!
//! Every failure a request can hit is one of these variants. Interpreters
//! return them and the handler turns them into a response status at the
//! boundary, so nothing past the handler ever sees a resolver error.

use thiserror::Error;

use crate::http::response::Status;
use crate::resolver::ResolveError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed path, missing markers, unknown record type, wrong POST
    /// path or an empty result set.
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// Request line without the ` HTTP/1.1` suffix.
    #[error("malformed request line")]
    TransportParse,

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl GatewayError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            GatewayError::BadRequest(_) | GatewayError::TransportParse => Status::BadRequest,
            GatewayError::MethodNotAllowed(_) => Status::MethodNotAllowed,
            GatewayError::Resolve(ResolveError::NotFound) => Status::NotFound,
            GatewayError::Resolve(ResolveError::Failed(_)) => Status::ServerError,
        }
    }
}
