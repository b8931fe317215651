use thiserror::Error;

/// Per-symbol fetch failures. None of these are fatal to the evaluator; the
/// kinds let callers tell transient failures (retry next cycle) from
/// permanent ones (the symbol will never resolve).
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Price request failed: {0}")]
    Network(String),

    #[error("Symbol pair '{0}' is unknown to the price feed")]
    NotFound(String),

    #[error("Malformed price feed response: {0}")]
    BadResponse(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        PriceError::Network(e.to_string())
    }
}
