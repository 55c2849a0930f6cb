//! WebSocket connection handler
//!
//! Handles individual connections: WebSocket handshake, action parsing,
//! and bidirectional communication with the ChatServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ConnectionId;

/// Per-connection outbound queue size used by [`handle_connection`]
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Handle a new TCP connection with the default outbound queue size
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    handle_connection_with_buffer(stream, cmd_tx, DEFAULT_OUTBOUND_BUFFER).await
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the connection with the
/// server, and pumps frames both ways until either side ends. Always
/// reports a disconnect once registered.
pub async fn handle_connection_with_buffer(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    outbound_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!("Connection {} opened from {}", connection_id, peer_addr);

    // Channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(outbound_buffer.max(1));
    let reply_tx = msg_tx.clone();

    // Queued first so it precedes anything the server sends
    let _ = msg_tx.try_send(ServerMessage::Connected {
        connection_id: connection_id.to_string(),
    });

    // Register with ChatServer; from here on nothing returns early
    // before the disconnect below
    if cmd_tx
        .send(ServerCommand::Connect {
            connection_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - server closed", connection_id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();

    // Read task (WebSocket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match parse_action(connection_id, &text) {
                    Ok(cmd) => {
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Server closed, ending read task for {}", connection_id);
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Invalid frame from {}: {}", connection_id, err);
                        // Malformed frames never close the connection
                        let _ = reply_tx.try_send(err.into());
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", connection_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Write task (ServerMessage -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", connection_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", connection_id);
            read_task.abort();
        }
    }

    let _ = cmd_tx
        .send(ServerCommand::Disconnect { connection_id })
        .await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Parse a text frame into a command for the server
pub fn parse_action(connection_id: ConnectionId, text: &str) -> Result<ServerCommand, AppError> {
    let msg = serde_json::from_str::<ClientMessage>(text)?;
    Ok(client_message_to_command(connection_id, msg))
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(connection_id: ConnectionId, msg: ClientMessage) -> ServerCommand {
    match msg {
        ClientMessage::Login { username } => ServerCommand::Login {
            connection_id,
            username,
        },
        ClientMessage::CreateRoom { name, description } => ServerCommand::CreateRoom {
            connection_id,
            name,
            description,
        },
        ClientMessage::JoinRoom { room_code } => ServerCommand::JoinRoom {
            connection_id,
            room_code,
        },
        ClientMessage::SendMessage { text } => ServerCommand::SendMessage {
            connection_id,
            text,
        },
        ClientMessage::ClearChat => ServerCommand::ClearChat { connection_id },
        ClientMessage::LeaveRoom => ServerCommand::LeaveRoom { connection_id },
        ClientMessage::Ping => ServerCommand::Ping { connection_id },
        ClientMessage::Status => ServerCommand::StatusRequest { connection_id },
    }
}
