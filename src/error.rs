use thiserror::Error;
use tonic::{Code, Status};

use crate::searcher::collector::DEADLINE_EXCEEDED_MSG;

/// Result type alias
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error surface of the gateway.
///
/// The four kinds callers must be able to tell apart are kept as distinct
/// variants: index I/O failure (`Index`/`Io`), query timeout (`Timeout`),
/// invalid argument (`InvalidArgument`) and transport failure (`Transport`).
#[derive(Error, Debug)]
pub enum SearchError {
    /// Underlying index unreadable, corrupt, or the engine failed mid-query
    #[error("index error: {0}")]
    Index(String),

    /// Deadline elapsed during hit collection; no partial results exist
    #[error("search timed out: {0}")]
    Timeout(String),

    /// Rejected before any work began
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Document address or field does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote endpoint unreachable; the proxy will reconnect on the next call
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SearchError::Index(_) => "INDEX_ERROR",
            SearchError::Timeout(_) => "TIMEOUT",
            SearchError::InvalidArgument(_) => "INVALID_ARGUMENT",
            SearchError::NotFound(_) => "NOT_FOUND",
            SearchError::Transport(_) => "TRANSPORT_ERROR",
            SearchError::Configuration(_) => "CONFIGURATION_ERROR",
            SearchError::Serialization(_) => "SERIALIZATION_ERROR",
            SearchError::Io(_) => "IO_ERROR",
        }
    }

    /// True for transport-level failures, the kind that makes the client
    /// proxy drop its cached connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, SearchError::Transport(_))
    }

    /// Rebuild a domain error from a gRPC status on the client side.
    pub fn from_status(status: &Status) -> Self {
        let msg = status.message().to_string();
        match status.code() {
            Code::DeadlineExceeded => SearchError::Timeout(msg),
            Code::InvalidArgument => SearchError::InvalidArgument(msg),
            Code::NotFound => SearchError::NotFound(msg),
            Code::Unavailable => SearchError::Transport(msg),
            Code::FailedPrecondition => SearchError::Configuration(msg),
            _ => SearchError::Index(msg),
        }
    }
}

/// Engine errors surface as `Index`, except the deadline sentinel raised by
/// the collector, which stays a distinguishable `Timeout`.
impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        match err {
            tantivy::TantivyError::SystemError(msg) if msg == DEADLINE_EXCEEDED_MSG => {
                SearchError::Timeout(msg)
            }
            other => SearchError::Index(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Server-side mapping onto gRPC status codes.
impl From<SearchError> for Status {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Timeout(msg) => Status::deadline_exceeded(msg),
            SearchError::InvalidArgument(msg) => Status::invalid_argument(msg),
            SearchError::NotFound(msg) => Status::not_found(msg),
            SearchError::Transport(msg) => Status::unavailable(msg),
            SearchError::Configuration(msg) => Status::failed_precondition(msg),
            other => Status::internal(other.to_string()),
        }
    }
}
