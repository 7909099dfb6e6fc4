use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The origin could not be reached at all.
    #[error("Offline: {0}")]
    Offline(String),
}
