use thiserror::Error;

/// Errors surfaced by the transport layer shared across every venue adapter: REST request
/// construction/signing, response parsing, and the WebSocket reconnect loop.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to deserialise response body: {error}, payload: {}", String::from_utf8_lossy(payload))]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("failed to serialise request: {error}")]
    Serialise { error: serde_json::Error },

    #[error("failed to urlencode request: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),

    #[error("failed to build request url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("credentials missing or incomplete for this venue")]
    MissingCredentials,

    #[error("subscription/stream terminated: {0}")]
    Terminated(String),
}

/// Whether an error closes the channel/connection it occurred on for good, or whether the
/// caller may retry the same handle.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

impl Unrecoverable for SocketError {
    fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::WebSocket(_) | Self::MissingCredentials)
    }
}
