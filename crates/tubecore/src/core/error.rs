use thiserror::Error;

use crate::presentation::NoticeKind;

/// Centralized error type for the client core.
///
/// Every fallible operation in `tubecore` returns this enum. Validation
/// failures are raised before any remote call is made; everything else
/// comes from talking to the download service.
///
/// # Example
///
/// ```
/// use tubecore::core::error::AppError;
/// use tubecore::presentation::NoticeKind;
///
/// let err = AppError::Validation("please enter a video URL".into());
/// assert_eq!(err.notice_kind(), NoticeKind::Validation);
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Input rejected locally (empty URL, task already in flight)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The service answered with a non-success status
    #[error("Remote error: {message}")]
    Remote {
        /// HTTP status code, when the failure came from a response
        status: Option<u16>,
        /// Server-reported message, or a generic fallback
        message: String,
    },

    /// Connection, TLS or body-read failures
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx body that did not match the expected shape
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Builds a `Remote` error, falling back to `generic` when the server
    /// sent no usable message.
    pub fn remote(status: Option<u16>, message: Option<String>, generic: &str) -> Self {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| generic.to_string());
        AppError::Remote { status, message }
    }

    /// Which notice category this error is surfaced under.
    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            AppError::Validation(_) => NoticeKind::Validation,
            _ => NoticeKind::Remote,
        }
    }

    /// Text shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Config(msg) => msg.clone(),
            AppError::Remote { message, .. } => message.clone(),
            AppError::Transport(e) => format!("could not reach the download service: {}", e),
            AppError::Decode(_) => "the download service sent an unexpected response".to_string(),
            AppError::Url(e) => format!("invalid URL: {}", e),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}
