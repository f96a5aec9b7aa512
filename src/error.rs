//! Error types shared by the streaming pipeline

use crate::filter::FilterConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop a pageviews stream (or prevent it from starting)
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("HTTP {status} fetching {url}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to write cache file {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Decompression error: {0}")]
    Decode(#[source] io::Error),

    #[error("Invalid filter: {0}")]
    FilterConfig(#[from] FilterConfigError),

    #[error("Invalid pageviews filename: {0:?}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Raised by the cache tee when the sink fails. Travels through `Read` as
/// the payload of an `io::Error` and is unwrapped again by the line decoder.
#[derive(Debug, Error)]
#[error("cache write to {} failed: {source}", path.display())]
pub struct CacheWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl CacheWriteError {
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

impl From<CacheWriteError> for StreamError {
    fn from(e: CacheWriteError) -> Self {
        StreamError::CacheWrite {
            path: e.path,
            source: e.source,
        }
    }
}

impl StreamError {
    /// Classify an error surfaced while reading through the decompressor.
    ///
    /// Cache sink failures are recovered from the wrapped payload; corrupt
    /// or truncated gzip data is reported as `Decode`; anything else is a
    /// plain I/O failure of the underlying source.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<CacheWriteError>())
        {
            let kind = err.kind();
            return match err.into_inner().map(|inner| inner.downcast::<CacheWriteError>()) {
                Some(Ok(cache)) => {
                    let CacheWriteError { path, source } = *cache;
                    StreamError::CacheWrite { path, source }
                }
                _ => StreamError::Io(io::Error::from(kind)),
            };
        }

        match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => StreamError::Decode(err),
            _ => StreamError::Io(err),
        }
    }

    /// Whether this error came from the cache sink rather than the source.
    pub fn is_cache_write(&self) -> bool {
        matches!(self, StreamError::CacheWrite { .. })
    }
}

/// Result alias for pipeline operations
pub type StreamResult<T> = Result<T, StreamError>;
