use thiserror::Error;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Dlget(#[from] DlgetError),
    #[error(transparent)]
    Vod(#[from] vod_lib::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
#[error("{details}")]
pub struct DlgetError {
    details: String,
}

impl DlgetError {
    pub fn new(msg: impl Into<String>) -> DlgetError {
        DlgetError {
            details: msg.into(),
        }
    }
}
