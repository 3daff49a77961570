//! Error types for the library layers. The UI branches on these variants (or
//! on [`ErrorKind`]) to pick the message it shows; `anyhow` only appears at
//! the application edge.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used when deciding how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No API key or auth header is configured. The user has to open the
    /// settings dialog.
    CredentialMissing,
    /// Non-2xx status or transport failure.
    Network,
    /// A response or file could not be decoded.
    Parse,
}

/// Failures of the metadata lookup client.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{credential} is not configured")]
    CredentialMissing { credential: &'static str },

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("search failed for item at index {index}")]
    EmptyResult { index: usize },

    #[error("invalid API base URL '{url}'")]
    InvalidBaseUrl { url: String },
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::CredentialMissing { .. } => ErrorKind::CredentialMissing,
            LookupError::Http { .. }
            | LookupError::Transport(_)
            | LookupError::EmptyResult { .. }
            | LookupError::InvalidBaseUrl { .. } => ErrorKind::Network,
            LookupError::Decode(_) => ErrorKind::Parse,
        }
    }

    pub fn is_credential_missing(&self) -> bool {
        self.kind() == ErrorKind::CredentialMissing
    }
}

/// Failures while reading or writing spreadsheet files.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("only .xlsx and .xls files are supported: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read spreadsheet: {0}")]
    Open(#[from] calamine::Error),

    #[error("the workbook does not contain any worksheet")]
    NoWorksheet,

    #[error("failed to write spreadsheet: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("file access failed: {0}")]
    Io(#[from] io::Error),
}

impl SpreadsheetError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

/// Failures of the session storage backends. These are logged and never
/// abort the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_credentials_from_network() {
        let missing = LookupError::CredentialMissing {
            credential: "API key",
        };
        assert!(missing.is_credential_missing());
        assert_eq!(missing.to_string(), "API key is not configured");

        let http = LookupError::Http {
            status: 502,
            reason: "Bad Gateway".into(),
        };
        assert_eq!(http.kind(), ErrorKind::Network);
        assert_eq!(http.to_string(), "HTTP 502: Bad Gateway");

        assert_eq!(LookupError::Decode("eof".into()).kind(), ErrorKind::Parse);
    }
}
