//! ChatServer Actor implementation
//!
//! The central actor that owns all state: sessions, rooms and message history.
//! Commands are processed one at a time to completion, so every action's
//! validation, mutation and fan-out is atomic with respect to the others.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, SendError};
use crate::history::MessageLog;
use crate::message::ServerMessage;
use crate::room::RoomRegistry;
use crate::session::SessionRegistry;
use crate::types::{ConnectionId, RoomCode};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Connection closed
    Disconnect { connection_id: ConnectionId },
    /// Choose a display name
    Login {
        connection_id: ConnectionId,
        username: String,
    },
    /// Create a new room
    CreateRoom {
        connection_id: ConnectionId,
        name: String,
        description: Option<String>,
    },
    /// Join an existing room
    JoinRoom {
        connection_id: ConnectionId,
        room_code: String,
    },
    /// Send a chat message to the current room
    SendMessage {
        connection_id: ConnectionId,
        text: String,
    },
    /// Clear the current room's history
    ClearChat { connection_id: ConnectionId },
    /// Leave the current room
    LeaveRoom { connection_id: ConnectionId },
    /// Liveness probe
    Ping { connection_id: ConnectionId },
    /// Status requested over the wire
    StatusRequest { connection_id: ConnectionId },
    /// Status requested in-process
    Status { reply: oneshot::Sender<ServerStatus> },
    /// Fails while being handled
    #[cfg(test)]
    Fault { connection_id: ConnectionId },
}

impl ServerCommand {
    /// Connection that issued the command, if any
    fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            ServerCommand::Connect { connection_id, .. }
            | ServerCommand::Disconnect { connection_id }
            | ServerCommand::Login { connection_id, .. }
            | ServerCommand::CreateRoom { connection_id, .. }
            | ServerCommand::JoinRoom { connection_id, .. }
            | ServerCommand::SendMessage { connection_id, .. }
            | ServerCommand::ClearChat { connection_id }
            | ServerCommand::LeaveRoom { connection_id }
            | ServerCommand::Ping { connection_id }
            | ServerCommand::StatusRequest { connection_id } => Some(*connection_id),
            #[cfg(test)]
            ServerCommand::Fault { connection_id } => Some(*connection_id),
            ServerCommand::Status { .. } => None,
        }
    }
}

/// Read-only server counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub room_count: usize,
    /// Logged-in connections
    pub participant_count: usize,
}

/// Ask a running ChatServer for its counters
pub async fn query_status(cmd_tx: &mpsc::Sender<ServerCommand>) -> Result<ServerStatus, AppError> {
    let (reply, rx) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Status { reply })
        .await
        .map_err(|_| AppError::ChannelSend)?;
    rx.await.map_err(|_| AppError::ChannelSend)
}

/// The main ChatServer actor
///
/// Owns the three stores and routes every command through them.
pub struct ChatServer {
    sessions: SessionRegistry,
    rooms: RoomRegistry,
    history: MessageLog,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Period of the status log
    status_interval: Option<Duration>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            rooms: RoomRegistry::new(),
            history: MessageLog::new(),
            receiver,
            status_interval: None,
        }
    }

    /// Log server counters periodically while running
    pub fn with_status_interval(mut self, interval: Option<Duration>) -> Self {
        self.status_interval = interval;
        self
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        let mut ticker = self
            .status_interval
            .map(|period| time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = tick(&mut ticker) => self.log_status(),
            }
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    ///
    /// Business errors go back to the acting connection only. A panic is
    /// contained to this command and answered with a generic failure.
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        let actor = cmd.connection_id();

        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(cmd))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                if let Some(id) = actor {
                    debug!("Rejected action from {}: {}", id, err);
                    self.reply(id, err.into());
                }
            }
            Err(_) => {
                error!("Fault while handling command from {:?}", actor);
                if let Some(id) = actor {
                    self.reply(id, ServerMessage::internal_error());
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: ServerCommand) -> Result<(), AppError> {
        match cmd {
            ServerCommand::Connect {
                connection_id,
                sender,
            } => {
                self.handle_connect(connection_id, sender);
                Ok(())
            }
            ServerCommand::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id);
                Ok(())
            }
            ServerCommand::Login {
                connection_id,
                username,
            } => self.handle_login(connection_id, username),
            ServerCommand::CreateRoom {
                connection_id,
                name,
                description,
            } => self.handle_create_room(connection_id, name, description),
            ServerCommand::JoinRoom {
                connection_id,
                room_code,
            } => self.handle_join_room(connection_id, room_code),
            ServerCommand::SendMessage {
                connection_id,
                text,
            } => self.handle_send_message(connection_id, text),
            ServerCommand::ClearChat { connection_id } => self.handle_clear_chat(connection_id),
            ServerCommand::LeaveRoom { connection_id } => {
                self.handle_leave_room(connection_id);
                Ok(())
            }
            ServerCommand::Ping { connection_id } => {
                self.reply(connection_id, ServerMessage::Pong);
                Ok(())
            }
            ServerCommand::StatusRequest { connection_id } => {
                let status = self.status();
                self.reply(
                    connection_id,
                    ServerMessage::Status {
                        room_count: status.room_count,
                        participant_count: status.participant_count,
                    },
                );
                Ok(())
            }
            ServerCommand::Status { reply } => {
                let _ = reply.send(self.status());
                Ok(())
            }
            #[cfg(test)]
            ServerCommand::Fault { connection_id } => {
                panic!("fault injected for {}", connection_id)
            }
        }
    }

    /// Current counters
    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            room_count: self.rooms.len(),
            participant_count: self.sessions.logged_in_count(),
        }
    }

    fn log_status(&self) {
        info!(
            rooms = self.rooms.len(),
            participants = self.sessions.logged_in_count(),
            connections = self.sessions.len(),
            messages = self.history.total(),
            reclaimable = self.rooms.reclaimable_count(),
            "Status"
        );
    }

    /// Handle new connection
    fn handle_connect(&mut self, connection_id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        info!("Connection {} registered", connection_id);
        self.sessions.connect(connection_id, sender);
        debug!(
            "Total connections: {}, Total rooms: {}",
            self.sessions.len(),
            self.rooms.len()
        );
    }

    /// Handle disconnection as an implicit leave of the current room
    fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(session) = self.sessions.logout(connection_id) else {
            return;
        };
        info!(
            "Connection {} ({}) disconnected",
            connection_id,
            session.name().unwrap_or("anonymous")
        );

        if let (Some(name), Some(code)) = (session.display_name, session.current_room) {
            self.leave_and_notify(&name, &code, "lost connection");
        }

        debug!(
            "Total connections: {}, Total rooms: {}",
            self.sessions.len(),
            self.rooms.len()
        );
    }

    /// Handle login
    fn handle_login(
        &mut self,
        connection_id: ConnectionId,
        username: String,
    ) -> Result<(), AppError> {
        let rooms = self.sessions.login(connection_id, &username, &self.rooms)?;
        let username = self.logged_in_name(connection_id)?;

        self.reply(connection_id, ServerMessage::LoginSuccess { username, rooms });
        Ok(())
    }

    /// Handle room creation
    fn handle_create_room(
        &mut self,
        connection_id: ConnectionId,
        name: String,
        description: Option<String>,
    ) -> Result<(), AppError> {
        let creator = self.sessions.get(connection_id).and_then(|s| s.display_name.clone());
        let room = self
            .rooms
            .create_room(creator.as_deref(), &name, description)?
            .clone();

        self.enter_room(connection_id, room.code.clone());

        self.reply(
            connection_id,
            ServerMessage::RoomCreated {
                room_code: room.code.to_string(),
                room,
            },
        );
        Ok(())
    }

    /// Handle room joining
    fn handle_join_room(
        &mut self,
        connection_id: ConnectionId,
        room_code: String,
    ) -> Result<(), AppError> {
        let name = self.logged_in_name(connection_id)?;
        if room_code.trim().is_empty() {
            return Err(AppError::validation("Room code is required"));
        }
        let code = RoomCode::from_string(&room_code);

        let room = self.rooms.join_room(&name, &code)?.clone();
        self.enter_room(connection_id, code.clone());

        self.reply(
            connection_id,
            ServerMessage::RoomJoined {
                room: room.clone(),
                messages: self.history.read(&code).to_vec(),
            },
        );

        self.broadcast(&code, ServerMessage::RoomUpdated { room: room.clone() });
        self.broadcast(
            &code,
            ServerMessage::UserJoined {
                username: name.clone(),
                members: room.members,
                message: format!("{} joined the room", name),
            },
        );
        Ok(())
    }

    /// Handle chat message
    fn handle_send_message(
        &mut self,
        connection_id: ConnectionId,
        text: String,
    ) -> Result<(), AppError> {
        let name = self.logged_in_name(connection_id)?;
        let code = self.current_room(connection_id)?;

        let Some(message) = self.history.append(&code, &name, &text) else {
            debug!("Dropped blank message from {} in room {}", connection_id, code);
            return Ok(());
        };
        debug!("'{}' sent message {} in room {}", name, message.id, code);

        self.broadcast(&code, ServerMessage::NewMessage { message });
        Ok(())
    }

    /// Handle chat clearing (creator only)
    fn handle_clear_chat(&mut self, connection_id: ConnectionId) -> Result<(), AppError> {
        let name = self.logged_in_name(connection_id)?;
        let code = self.current_room(connection_id)?;

        self.rooms.clear_messages(&name, &code, &mut self.history)?;

        self.broadcast(&code, ServerMessage::ChatCleared);
        Ok(())
    }

    /// Handle voluntary room leaving; silent when not in a room
    fn handle_leave_room(&mut self, connection_id: ConnectionId) {
        let Some(session) = self.sessions.get_mut(connection_id) else {
            return;
        };
        let Some(code) = session.leave_current_room() else {
            return;
        };
        let Some(name) = session.display_name.clone() else {
            return;
        };

        self.leave_and_notify(&name, &code, "left the room");
    }

    /// Helper: Remove a member from a room and tell whoever remains
    fn leave_and_notify(&mut self, name: &str, code: &RoomCode, reason: &str) {
        let Some(room) = self.rooms.leave_room(name, code).cloned() else {
            return;
        };

        self.broadcast(code, ServerMessage::RoomUpdated { room: room.clone() });
        self.broadcast(
            code,
            ServerMessage::UserLeft {
                username: name.to_string(),
                members: room.members,
                message: format!("{} {}", name, reason),
            },
        );
    }

    /// Helper: Display name of a logged-in connection
    fn logged_in_name(&self, connection_id: ConnectionId) -> Result<String, AppError> {
        self.sessions
            .get(connection_id)
            .and_then(|s| s.display_name.clone())
            .ok_or_else(AppError::not_logged_in)
    }

    /// Helper: Code of the existing room a connection is acting in
    fn current_room(&self, connection_id: ConnectionId) -> Result<RoomCode, AppError> {
        self.sessions
            .get(connection_id)
            .and_then(|s| s.current_room.clone())
            .filter(|code| self.rooms.get(code).is_some())
            .ok_or_else(AppError::not_in_room)
    }

    fn enter_room(&mut self, connection_id: ConnectionId, code: RoomCode) {
        if let Some(session) = self.sessions.get_mut(connection_id) {
            session.enter_room(code);
        }
    }

    /// Helper: Direct reply to one connection
    fn reply(&self, connection_id: ConnectionId, msg: ServerMessage) {
        if let Some(session) = self.sessions.get(connection_id) {
            report_send(connection_id, session.send(msg));
        }
    }

    /// Helper: Deliver to every connection that has entered the room
    fn broadcast(&self, code: &RoomCode, msg: ServerMessage) {
        for session in self.sessions.in_room(code) {
            report_send(session.id, session.send(msg.clone()));
        }
    }
}

fn report_send(connection_id: ConnectionId, result: Result<(), SendError>) {
    match result {
        Ok(()) => {}
        Err(SendError::ChannelFull) => {
            warn!("Outbound queue full for {}, notification dropped", connection_id)
        }
        Err(SendError::ChannelClosed) => {
            debug!("Outbound channel closed for {}", connection_id)
        }
    }
}

/// Wait for the next status tick, or forever when disabled
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
