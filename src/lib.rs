//! Room-based WebSocket Chat Server Library
//!
//! Participants log in with a display name, create rooms identified by
//! 5-character codes, join them by code, and chat with everyone in the
//! room. Room history lives in memory for the lifetime of the process.
//!
//! # Features
//! - Display-name login, listing rooms that already include the name
//! - Room creation with unique 5-character `[A-Z0-9]` codes
//! - Case-insensitive joining by code, with full history on join
//! - Chat broadcast to every member, including the sender
//! - Creator-only chat clearing
//! - Leave and disconnect handling with membership broadcasts
//! - Status query and periodic status logging
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the session registry,
//!   room registry and message log
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - commands are handled one at a time to completion
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use roomchat::{ChatServer, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod message;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, handle_connection_with_buffer};
pub use history::{ChatMessage, MessageLog};
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use room::{Room, RoomRegistry};
pub use server::{query_status, ChatServer, ServerCommand, ServerStatus};
pub use session::{Session, SessionRegistry};
pub use types::{ConnectionId, RoomCode};
