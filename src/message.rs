//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::history::ChatMessage;
use crate::room::Room;

/// Client → Server message
///
/// All actions a participant can take. Tag names are snake_case,
/// payload fields camelCase. Missing strings deserialize as empty and
/// are rejected during dispatch.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Choose a display name (required before room operations)
    Login {
        #[serde(default)]
        username: String,
    },
    /// Create a new room
    CreateRoom {
        #[serde(default)]
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    /// Join an existing room by code
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        room_code: String,
    },
    /// Send a chat message to the current room
    SendMessage {
        #[serde(default)]
        text: String,
    },
    /// Clear the current room's history (creator only)
    ClearChat,
    /// Leave the current room
    LeaveRoom,
    /// Liveness probe
    Ping,
    /// Ask for server-wide counters
    Status,
}

/// Server → Client message
///
/// All notifications from server to client, either direct replies or
/// room broadcasts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted, connection ID issued
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: String },
    /// Login accepted, with rooms already listing this name
    LoginSuccess { username: String, rooms: Vec<Room> },
    /// Room created successfully
    #[serde(rename_all = "camelCase")]
    RoomCreated { room: Room, room_code: String },
    /// Room joined; full history for the joiner
    RoomJoined {
        room: Room,
        messages: Vec<ChatMessage>,
    },
    /// Room state changed (membership)
    RoomUpdated { room: Room },
    /// Someone joined the room
    UserJoined {
        username: String,
        members: Vec<String>,
        message: String,
    },
    /// Someone left the room or dropped
    UserLeft {
        username: String,
        members: Vec<String>,
        message: String,
    },
    /// Chat message received
    NewMessage { message: ChatMessage },
    /// Room history was cleared
    ChatCleared,
    /// Reply to ping
    Pong,
    /// Server-wide counters
    #[serde(rename_all = "camelCase")]
    Status {
        room_count: usize,
        participant_count: usize,
    },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerMessage::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing field, not logged in, or not in a room
    ValidationError,
    /// Non-existent room code
    NotFound,
    /// Creator-only action by another member
    PermissionDenied,
    /// Frame did not parse as any action
    InvalidMessage,
    /// Fault while handling the action
    Internal,
}

impl ServerMessage {
    /// Generic failure reply for faults during handling
    pub fn internal_error() -> Self {
        ServerMessage::Error {
            code: ErrorCode::Internal,
            message: "Something went wrong while handling the request".to_string(),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            AppError::Json(_) => ErrorCode::InvalidMessage,
            // Transport errors close the connection; nothing useful to say
            _ => return ServerMessage::internal_error(),
        };
        let message = match err {
            AppError::Json(e) => format!("Invalid message format: {}", e),
            other => other.to_string(),
        };
        ServerMessage::Error { code, message }
    }
}
