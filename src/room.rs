//! Room and RoomRegistry definitions
//!
//! A room is identified by a short code and tracks its members by
//! display name. The registry owns every room for the process lifetime.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::history::MessageLog;
use crate::types::RoomCode;

/// Description used when the creator supplies none
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Chat room
///
/// The creator is fixed at creation and keeps creator rights even after
/// leaving. Members are display names, kept in join order without duplicates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room code for identification
    pub code: RoomCode,
    pub name: String,
    pub description: String,
    /// Display name of the room creator
    pub creator: String,
    /// Display names of current members
    pub members: Vec<String>,
    /// Room creation time
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room whose only member is its creator
    pub fn new(code: RoomCode, name: String, description: Option<String>, creator: String) -> Self {
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        Self {
            code,
            name,
            description,
            members: vec![creator.clone()],
            creator,
            created_at: Utc::now(),
        }
    }

    /// Check if a display name is a member of this room
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Add a member
    ///
    /// Returns false if the name was already a member.
    pub fn add_member(&mut self, name: &str) -> bool {
        if self.contains(name) {
            false
        } else {
            self.members.push(name.to_string());
            true
        }
    }

    /// Remove a member
    ///
    /// Returns true if the name was a member.
    pub fn remove_member(&mut self, name: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != name);
        self.members.len() != before
    }

    /// Check if the room has no members left
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_creator(&self, name: &str) -> bool {
        self.creator == name
    }
}

/// Owner of all rooms, keyed by upper-case code
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a freshly sampled, unused code
    pub fn create_room(
        &mut self,
        creator: Option<&str>,
        name: &str,
        description: Option<String>,
    ) -> Result<&Room, AppError> {
        let creator = creator.ok_or_else(AppError::not_logged_in)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Room name is required"));
        }

        // Resample until the code is free
        let code = loop {
            let code = RoomCode::generate();
            if !self.rooms.contains_key(&code) {
                break code;
            }
        };

        info!("Room {} '{}' created by '{}'", code, name, creator);
        let room = Room::new(code.clone(), name.to_string(), description, creator.to_string());
        Ok(&*self.rooms.entry(code).or_insert(room))
    }

    /// Add a member to the room with the given code (idempotent)
    pub fn join_room(&mut self, name: &str, code: &RoomCode) -> Result<&Room, AppError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| AppError::NotFound(code.to_string()))?;
        if room.add_member(name) {
            info!("'{}' joined room {}", name, code);
        }
        Ok(&*room)
    }

    /// Remove a member from a room
    ///
    /// Missing rooms and non-members are not errors. Returns the room's
    /// state after removal when the room exists.
    pub fn leave_room(&mut self, name: &str, code: &RoomCode) -> Option<&Room> {
        let room = self.rooms.get_mut(code)?;
        if room.remove_member(name) {
            info!("'{}' left room {}", name, code);
        }
        if room.is_empty() {
            info!("Room {} is empty, eligible for reclamation", code);
        }
        Some(&*room)
    }

    /// Truncate a room's history on behalf of its creator
    pub fn clear_messages(
        &self,
        name: &str,
        code: &RoomCode,
        log: &mut MessageLog,
    ) -> Result<(), AppError> {
        let room = self
            .rooms
            .get(code)
            .ok_or_else(|| AppError::NotFound(code.to_string()))?;
        if !room.is_creator(name) {
            return Err(AppError::PermissionDenied(
                "Only the room creator can clear the chat".to_string(),
            ));
        }
        log.clear(code);
        info!("Chat in room {} cleared by '{}'", code, name);
        Ok(())
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Rooms whose membership currently includes the given name
    pub fn rooms_with_member(&self, name: &str) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .values()
            .filter(|r| r.contains(name))
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.created_at);
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Number of rooms with no members left
    pub fn reclaimable_count(&self) -> usize {
        self.rooms.values().filter(|r| r.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn registry_with_room(creator: &str) -> (RoomRegistry, RoomCode) {
        let mut registry = RoomRegistry::new();
        let code = registry
            .create_room(Some(creator), "Demo", None)
            .unwrap()
            .code
            .clone();
        (registry, code)
    }

    #[test]
    fn test_room_creation() {
        let (registry, code) = registry_with_room("alice");
        let room = registry.get(&code).unwrap();

        assert_eq!(room.name, "Demo");
        assert_eq!(room.creator, "alice");
        assert_eq!(room.members, vec!["alice".to_string()]);
        assert_eq!(room.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_create_requires_login_and_name() {
        let mut registry = RoomRegistry::new();
        assert!(matches!(
            registry.create_room(None, "Demo", None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry.create_room(Some("alice"), "   ", None),
            Err(AppError::Validation(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_codes_are_unique() {
        let mut registry = RoomRegistry::new();
        let mut seen = HashSet::new();
        for i in 0..500 {
            let code = registry
                .create_room(Some("alice"), &format!("room {}", i), None)
                .unwrap()
                .code
                .clone();
            assert!(seen.insert(code));
        }
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn test_join_is_idempotent() {
        let (mut registry, code) = registry_with_room("alice");

        registry.join_room("bob", &code).unwrap();
        let room = registry.join_room("bob", &code).unwrap();

        assert_eq!(room.members, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_join_unknown_room() {
        let mut registry = RoomRegistry::new();
        let code = RoomCode::from_string("zzzzz");
        assert!(matches!(
            registry.join_room("bob", &code),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_leave_keeps_empty_room() {
        let (mut registry, code) = registry_with_room("alice");

        let room = registry.leave_room("alice", &code).unwrap();
        assert!(room.is_empty());

        // Second leave is a no-op
        assert!(registry.leave_room("alice", &code).unwrap().is_empty());
        assert!(registry.leave_room("alice", &RoomCode::from_string("nope1")).is_none());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.reclaimable_count(), 1);
    }

    #[test]
    fn test_rooms_with_member() {
        let (mut registry, code) = registry_with_room("alice");
        registry.create_room(Some("carol"), "Other", None).unwrap();
        registry.join_room("bob", &code).unwrap();

        let rooms = registry.rooms_with_member("bob");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].code, code);
        assert!(registry.rooms_with_member("dave").is_empty());
    }

    #[test]
    fn test_clear_messages_creator_only() {
        let (mut registry, code) = registry_with_room("alice");
        registry.join_room("bob", &code).unwrap();
        let mut log = MessageLog::new();
        log.append(&code, "alice", "hi");

        assert!(matches!(
            registry.clear_messages("bob", &code, &mut log),
            Err(AppError::PermissionDenied(_))
        ));
        assert_eq!(log.read(&code).len(), 1);

        registry.clear_messages("alice", &code, &mut log).unwrap();
        assert!(log.read(&code).is_empty());
    }
}
