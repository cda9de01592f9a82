use std::{error::Error as StdError, io, path::PathBuf};

use reqwest::{Error as ReqwestError, StatusCode};
use thiserror::Error;
use url::ParseError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The playlist text does not follow the expected grammar.
    #[error("malformed playlist (line {line}): {reason}")]
    MalformedPlaylist { line: usize, reason: String },
    /// A 1-based quality index outside of the available variants.
    #[error("quality {selected} doesn't exist, there are {available} qualities available")]
    InvalidQualitySelection { selected: usize, available: usize },
    /// A segment could not be fetched, the whole download is aborted.
    #[error("failed to download segment {} ({uri})", .index + 1)]
    SegmentFetchFailed {
        index: usize,
        uri: String,
        #[source]
        source: Box<Error>,
    },
    /// The output file could not be assembled.
    #[error("merging failed at {}", .path.display())]
    MergeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The download was cancelled before it could finish.
    #[error("download cancelled")]
    Cancelled,
    /// Http error.
    #[error(transparent)]
    Reqwest(#[from] ReqwestError),
    /// The server answered with a non success status.
    #[error("{url} returned {status}")]
    Status { status: StatusCode, url: String },
    /// Url error.
    #[error(transparent)]
    Url(#[from] ParseError),
    /// IO error
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedPlaylist {
            line,
            reason: reason.into(),
        }
    }

    /// Returns true for the connection reset class of errors, the only
    /// errors a segment fetch is retried on.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Io(e) => is_reset(e.kind()),
            Error::Reqwest(e) => {
                let mut source = e.source();
                while let Some(err) = source {
                    if let Some(io) = err.downcast_ref::<io::Error>() {
                        if is_reset(io.kind()) {
                            return true;
                        }
                    }
                    source = err.source();
                }
                false
            }
            _ => false,
        }
    }
}

fn is_reset(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}
