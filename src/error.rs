//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (reported to the acting connection only).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// A required field is missing, or the action needs a login or room context
    #[error("{0}")]
    Validation(String),

    /// Room code does not resolve
    #[error("Room not found: {0}")]
    NotFound(String),

    /// A creator-only action attempted by someone else
    #[error("{0}")]
    PermissionDenied(String),
}

impl AppError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_logged_in() -> Self {
        Self::validation("You must log in first")
    }

    pub(crate) fn not_in_room() -> Self {
        Self::validation("You are not in a room")
    }
}

/// Message send errors
///
/// Occurs when attempting to deliver a notification to a connection
/// whose outbound queue is gone or saturated.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The outbound queue is full; the notification was dropped
    #[error("Channel full")]
    ChannelFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_error_messages() {
        assert_eq!(
            AppError::NotFound("ABCDE".to_string()).to_string(),
            "Room not found: ABCDE"
        );
        assert_eq!(AppError::not_in_room().to_string(), "You are not in a room");
    }
}
