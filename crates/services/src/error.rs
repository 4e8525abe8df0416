use crate::transport::TransportError;

/// Failure inside a live integration.
///
/// Never crosses a service boundary: services turn it into the `error`
/// string of their result type.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The remote side answered but reported a failure.
    #[error("{0}")]
    Rejected(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
