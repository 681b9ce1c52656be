use thiserror::Error;

/// Why a status fetch produced no usable result this tick.
///
/// Every variant means "unknown, skip"; a confirmed offline channel is an
/// `Ok(LiveStatus::Offline)`, never an error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("api error: {0}")]
    Api(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("could not resolve channel id for {0:?}")]
    ChannelUnresolved(String),
}

impl FetchError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
