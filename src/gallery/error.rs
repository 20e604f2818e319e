//! Classification of failed gallery responses.

use reqwest::StatusCode;
use serde::Deserialize;

/// A gallery request that came back with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    /// HTTP 404
    NotFound(String),
    /// HTTP 409, the resource already exists
    Conflict(String),
    /// HTTP 401 or 403
    Unauthorized(String),
    /// Any other failure status
    Status { code: u16, message: String },
}

impl std::fmt::Display for GalleryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GalleryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            GalleryError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            GalleryError::Unauthorized(msg) => {
                write!(f, "Authentication failed: {}. Check your Personal Access Token.", msg)
            }
            GalleryError::Status { code, message } => {
                write!(f, "Gallery request failed with HTTP {}: {}", code, message)
            }
        }
    }
}

impl std::error::Error for GalleryError {}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GalleryError {
    /// Build an error from a response status and its body text.
    ///
    /// The gallery reports failures as JSON with a `message` field; other
    /// bodies are used verbatim, and an empty body falls back to the status reason.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.trim().to_string());
        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            message
        };

        match status {
            StatusCode::NOT_FOUND => GalleryError::NotFound(message),
            StatusCode::CONFLICT => GalleryError::Conflict(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                GalleryError::Unauthorized(message)
            }
            s => GalleryError::Status {
                code: s.as_u16(),
                message,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GalleryError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GalleryError::Conflict(_))
    }

    /// Mutable access to the message, used to append remediation hints in place.
    pub fn message_mut(&mut self) -> &mut String {
        match self {
            GalleryError::NotFound(msg)
            | GalleryError::Conflict(msg)
            | GalleryError::Unauthorized(msg)
            | GalleryError::Status { message: msg, .. } => msg,
        }
    }
}
