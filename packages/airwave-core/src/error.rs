//! Centralized error types for the Airwave core library.
//!
//! Playback-path failures never surface through these types - the controller
//! absorbs them and reports outcomes via status changes. The errors here
//! cover the edges where a caller can actually act on a failure:
//! configuration validation and the HTTP side of the metadata pipeline.

use thiserror::Error;

use crate::media::MediaError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for MediaError {
    fn code(&self) -> &'static str {
        match self {
            MediaError::NoSource => "no_source",
            MediaError::Rejected(_) => "play_rejected",
        }
    }
}

/// Application-wide error type for the Airwave core library.
#[derive(Debug, Error)]
pub enum AirwaveError {
    /// The media element rejected an operation.
    #[error("media error: {0}")]
    Media(#[from] MediaError),

    /// An HTTP request (metadata feed, cover-art lookup) failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ErrorCode for AirwaveError {
    fn code(&self) -> &'static str {
        match self {
            Self::Media(_) => "media_error",
            Self::Http(_) => "http_request_failed",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Convenient Result alias for library-wide operations.
pub type AirwaveResult<T> = Result<T, AirwaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_returns_correct_code() {
        let err = AirwaveError::Configuration("test".into());
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn media_error_converts_and_keeps_code() {
        let err: AirwaveError = MediaError::NoSource.into();
        assert_eq!(err.code(), "media_error");
        assert_eq!(MediaError::NoSource.code(), "no_source");
    }
}
