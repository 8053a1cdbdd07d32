use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

/// Failures talking to the rendering backend, tagged with the page URL.
#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("render of {url} failed: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("render of {url} rejected (status {status}): {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },
}

impl BrowserlessError {
    /// Page URL the failed render was for, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            BrowserlessError::Client(_) => None,
            BrowserlessError::Unreachable { url, .. } | BrowserlessError::Rejected { url, .. } => {
                Some(url)
            }
        }
    }
}
