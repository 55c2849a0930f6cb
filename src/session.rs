//! Session and SessionRegistry definitions
//!
//! A session is one live connection: its outbound channel, the display
//! name chosen at login, the room it is currently acting in and every
//! room it has entered. Room broadcasts follow the rooms a connection
//! entered, not its display name.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::info;

use crate::error::{AppError, SendError};
use crate::message::ServerMessage;
use crate::room::{Room, RoomRegistry};
use crate::types::{ConnectionId, RoomCode};

/// Connected participant
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Display name (None before login)
    pub display_name: Option<String>,
    /// Room the connection last created or joined
    pub current_room: Option<RoomCode>,
    /// Rooms this connection receives broadcasts for
    joined_rooms: HashSet<RoomCode>,
    /// Server → Client message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Session {
    /// Create a new session with the given ID and sender channel
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            display_name: None,
            current_room: None,
            joined_rooms: HashSet::new(),
            sender,
        }
    }

    /// Queue a message for this connection
    ///
    /// Never waits: a full queue drops the message.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Check if this session has logged in
    pub fn is_logged_in(&self) -> bool {
        self.display_name.is_some()
    }

    /// Make a room current and subscribe to its broadcasts
    pub fn enter_room(&mut self, code: RoomCode) {
        self.joined_rooms.insert(code.clone());
        self.current_room = Some(code);
    }

    /// Drop the current room and its subscription, returning its code
    pub fn leave_current_room(&mut self) -> Option<RoomCode> {
        let code = self.current_room.take()?;
        self.joined_rooms.remove(&code);
        Some(code)
    }

    /// Check if this connection receives broadcasts for a room
    pub fn has_joined(&self, code: &RoomCode) -> bool {
        self.joined_rooms.contains(code)
    }
}

/// All live sessions, keyed by connection
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection
    pub fn connect(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.sessions.insert(id, Session::new(id, sender));
    }

    /// Attach a display name to a connection
    ///
    /// A second login overwrites the name. Returns the rooms that
    /// already list the name as a member.
    pub fn login(
        &mut self,
        id: ConnectionId,
        display_name: &str,
        rooms: &RoomRegistry,
    ) -> Result<Vec<Room>, AppError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::validation("Unknown connection"))?;

        session.display_name = Some(display_name.to_string());
        info!("Connection {} logged in as '{}'", id, display_name);

        Ok(rooms.rooms_with_member(display_name))
    }

    /// Forget a connection, returning its session
    pub fn logout(&mut self, id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Sessions that have entered the given room and not left it
    pub fn in_room<'a>(&'a self, code: &'a RoomCode) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions.values().filter(move |s| s.has_joined(code))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Number of connections that have chosen a display name
    pub fn logged_in_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_logged_in()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let session = Session::new(ConnectionId::new(), tx);

        assert!(!session.is_logged_in());
        assert!(session.name().is_none());
        assert!(session.current_room.is_none());
    }

    #[tokio::test]
    async fn test_send_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let session = Session::new(ConnectionId::new(), tx);

        session.send(ServerMessage::Pong).unwrap();
        assert!(matches!(
            session.send(ServerMessage::Pong),
            Err(SendError::ChannelFull)
        ));

        drop(rx);
        assert!(matches!(
            session.send(ServerMessage::Pong),
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_login_validates_and_overwrites() {
        let rooms = RoomRegistry::new();
        let mut sessions = SessionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(32);
        sessions.connect(id, tx);

        assert!(matches!(
            sessions.login(id, "  ", &rooms),
            Err(AppError::Validation(_))
        ));
        assert!(!sessions.get(id).unwrap().is_logged_in());

        sessions.login(id, "Alice", &rooms).unwrap();
        sessions.login(id, "Alicia", &rooms).unwrap();
        assert_eq!(sessions.get(id).unwrap().name(), Some("Alicia"));
    }

    #[tokio::test]
    async fn test_login_returns_rooms_with_membership() {
        let mut rooms = RoomRegistry::new();
        let code = rooms.create_room(Some("alice"), "Demo", None).unwrap().code.clone();
        rooms.create_room(Some("bob"), "Other", None).unwrap();

        let mut sessions = SessionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(32);
        sessions.connect(id, tx);

        let joined = sessions.login(id, "alice", &rooms).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].code, code);
    }

    #[tokio::test]
    async fn test_in_room_follows_connections_not_names() {
        let rooms = RoomRegistry::new();
        let mut sessions = SessionRegistry::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        for id in [a, b, c] {
            let (tx, _rx) = mpsc::channel(32);
            sessions.connect(id, tx);
        }
        // b shares a's name but never enters the room
        sessions.login(a, "alice", &rooms).unwrap();
        sessions.login(b, "alice", &rooms).unwrap();
        let code = RoomCode::from_string("ABCDE");
        sessions.get_mut(a).unwrap().enter_room(code.clone());

        let ids: Vec<ConnectionId> = sessions.in_room(&code).map(|s| s.id).collect();
        assert_eq!(ids, vec![a]);

        // Renaming keeps the subscription
        sessions.login(a, "alicia", &rooms).unwrap();
        assert_eq!(sessions.in_room(&code).count(), 1);

        assert_eq!(sessions.get_mut(a).unwrap().leave_current_room(), Some(code.clone()));
        assert_eq!(sessions.in_room(&code).count(), 0);
        assert!(sessions.get_mut(a).unwrap().leave_current_room().is_none());

        assert!(sessions.logout(b).is_some());
        assert!(sessions.logout(b).is_none());
        assert_eq!(sessions.len(), 2);
    }
}
