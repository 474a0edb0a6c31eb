use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unrecognized range token '{0}'. Use 7days, 30days, 90days, or thisMonth.")]
    InvalidRangeToken(String),

    #[error("no account with id {0} is configured")]
    UnknownAccount(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Keyring(#[from] keyring::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

/// Machine-readable failure categories for a single data source. A failed
/// source degrades one dimension of the dashboard; it never aborts a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Timeout,
    PermissionDenied,
    NotFound,
    MalformedResponse,
    Transport,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(limit: std::time::Duration) -> Self {
        Self::new(
            SourceErrorKind::Timeout,
            format!("source did not respond within {}s", limit.as_secs()),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::MalformedResponse, message)
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SourceErrorKind::Timeout
        } else if err.is_decode() {
            SourceErrorKind::MalformedResponse
        } else {
            match err.status() {
                Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                    SourceErrorKind::PermissionDenied
                }
                Some(status) if status.as_u16() == 404 => SourceErrorKind::NotFound,
                _ => SourceErrorKind::Transport,
            }
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_error_reports_limit_in_seconds() {
        let err = SourceError::timeout(std::time::Duration::from_secs(30));
        assert_eq!(err.kind, SourceErrorKind::Timeout);
        assert!(err.message.contains("30s"));
    }

    #[test]
    fn invalid_range_token_names_the_accepted_tokens() {
        let err = AppError::InvalidRangeToken("2weeks".into());
        let text = err.to_string();
        assert!(text.contains("2weeks"));
        assert!(text.contains("thisMonth"));
    }
}
