//! Resolution queries and the two request grammars that produce them.
//!
//! GET requests carry one query in the path:
//! `/resolve?name=<NAME>&type=<TYPE>`. POST bodies carry one `name:type`
//! query per line. Markers are matched literally and in order; nothing is
//! percent-decoded or trimmed.

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

const NAME_MARKER: &str = "/resolve?name=";
const TYPE_MARKER: &str = "&type=";

/// DNS record type a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Ptr,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Ptr => "PTR",
        }
    }
}

impl FromStr for RecordType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "PTR" => Ok(RecordType::Ptr),
            _ => Err(GatewayError::BadRequest("unknown record type")),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(target, record type)` pair.
///
/// `target` is a domain name for A/AAAA and an IPv4 literal for PTR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionQuery {
    pub target: String,
    pub record_type: RecordType,
}

impl ResolutionQuery {
    pub fn new(target: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            target: target.into(),
            record_type,
        }
    }
}

/// A successfully resolved query, rendered as `target:TYPE=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub query: ResolutionQuery,
    pub value: String,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}={}",
            self.query.target, self.query.record_type, self.value
        )
    }
}

/// Parse the query out of a GET request path.
pub fn parse_get_path(path: &str) -> Result<ResolutionQuery, GatewayError> {
    let name_start = path
        .find(NAME_MARKER)
        .map(|pos| pos + NAME_MARKER.len())
        .ok_or(GatewayError::BadRequest("missing name parameter"))?;

    let rest = &path[name_start..];
    let (name, record_type) = rest
        .split_once(TYPE_MARKER)
        .ok_or(GatewayError::BadRequest("missing type parameter"))?;

    Ok(ResolutionQuery::new(name, record_type.parse()?))
}

/// Parse one `name:type` line of a POST body.
pub fn parse_query_line(line: &str) -> Result<ResolutionQuery, GatewayError> {
    let (name, record_type) = line
        .split_once(':')
        .ok_or(GatewayError::BadRequest("query line without type"))?;

    Ok(ResolutionQuery::new(name, record_type.parse()?))
}
