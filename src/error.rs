//! Errors raised while talking to the content source

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Content source returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Content source did not advertise a master ref")]
    MissingMasterRef,

    #[error("Invalid content source URL: {0}")]
    InvalidUrl(String),
}

impl CmsError {
    /// Whether the failure came from the content source rather than from us
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CmsError::Http(_)
                | CmsError::Status { .. }
                | CmsError::Decode { .. }
                | CmsError::MissingMasterRef
        )
    }
}
