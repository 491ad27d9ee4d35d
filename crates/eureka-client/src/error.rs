/// Failure talking to the registry or probing an instance.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{method} {path} failed: {source}")]
    Http {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned unexpected status {status}")]
    UnexpectedStatus {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("Malformed registry response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL `{0}`")]
    InvalidUrl(String),

    #[error("Unreachable: {0}")]
    Unreachable(String),
}
