use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Forbidden,
    NotFound,
    PayloadTooLarge,
    Internal,
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 415 | 422 => Self::Validation,
            401 | 403 => Self::Forbidden,
            404 => Self::NotFound,
            413 => Self::PayloadTooLarge,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

/// Failure reported by the remote store, either through a non-2xx status or
/// through a `success: false` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?} ({status}): {}", .message.as_deref().unwrap_or("no message"))]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_codes() {
        assert_eq!(ErrorCode::from_status(413), ErrorCode::PayloadTooLarge);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::Forbidden);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::Internal);
        assert_eq!(ErrorCode::from_status(200), ErrorCode::Unknown);
    }

    #[test]
    fn blank_server_messages_are_dropped() {
        let err = ApiError::new(400, Some("  ".into()));
        assert_eq!(err.message, None);
        assert_eq!(err.code, ErrorCode::Validation);
    }
}
