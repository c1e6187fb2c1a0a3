use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid traffic profile: {0}")]
    InvalidProfile(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gateway answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
