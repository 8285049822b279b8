use crate::transport::TransportError;
use thiserror::Error;

/// Unified error type for the opcall runtime.
///
/// This aggregates all low-level errors into actionable, high-level
/// categories. Cache I/O and transform failures are recovered where they
/// happen and never appear here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required path parameter(s): {}", .names.join(", "))]
    ParamRequired { names: Vec<String> },

    #[error("invalid parameters: {0}")]
    ParamInvalid(String),

    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("upstream returned HTTP {status}")]
    UpstreamHttp { status: u16, body: serde_json::Value },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable category, used when an error is flattened
    /// into an [`ApiError`](crate::executor::ApiError) result payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ParamRequired { .. } => "param_required",
            Error::ParamInvalid(_) => "param_invalid",
            Error::EndpointNotFound(_) => "endpoint_not_found",
            Error::Transport(_) => "transport",
            Error::UpstreamHttp { .. } => "upstream_http",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}
