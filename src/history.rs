//! Per-room message history
//!
//! Append-only, chronologically ordered logs keyed by room code.
//! Independent of who is connected; only a creator's clear truncates it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::RoomCode;

/// A chat message as stored and broadcast
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique within the process, increasing in append order
    pub id: u64,
    /// Trimmed, never empty
    pub text: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    pub room_code: RoomCode,
}

/// All room histories
#[derive(Debug, Default)]
pub struct MessageLog {
    logs: HashMap<RoomCode, Vec<ChatMessage>>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a room's log
    ///
    /// Blank text is dropped silently and yields `None`.
    pub fn append(
        &mut self,
        room_code: &RoomCode,
        sender: &str,
        text: &str,
    ) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.next_id += 1;
        let message = ChatMessage {
            id: self.next_id,
            text: text.to_string(),
            sender: sender.to_string(),
            timestamp: Utc::now(),
            room_code: room_code.clone(),
        };
        self.logs
            .entry(room_code.clone())
            .or_default()
            .push(message.clone());
        Some(message)
    }

    /// Empty a room's log
    pub fn clear(&mut self, room_code: &RoomCode) {
        if let Some(log) = self.logs.get_mut(room_code) {
            log.clear();
        }
    }

    /// Full ordered history of a room (empty if it has none)
    pub fn read(&self, room_code: &RoomCode) -> &[ChatMessage] {
        self.logs.get(room_code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of stored messages across all rooms
    pub fn total(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_in_order() {
        let mut log = MessageLog::new();
        let code = RoomCode::from_string("ABCDE");

        let first = log.append(&code, "alice", "  hello ").unwrap();
        let second = log.append(&code, "bob", "hi").unwrap();

        assert_eq!(first.text, "hello");
        assert!(second.id > first.id);

        let texts: Vec<&str> = log.read(&code).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "hi"]);
        assert_eq!(log.read(&code)[1].room_code, code);
    }

    #[test]
    fn test_blank_text_is_dropped() {
        let mut log = MessageLog::new();
        let code = RoomCode::from_string("ABCDE");

        assert!(log.append(&code, "alice", "").is_none());
        assert!(log.append(&code, "alice", " \t\n ").is_none());
        assert!(log.read(&code).is_empty());
        assert_eq!(log.total(), 0);
    }

    #[test]
    fn test_clear_only_affects_one_room() {
        let mut log = MessageLog::new();
        let a = RoomCode::from_string("AAAAA");
        let b = RoomCode::from_string("BBBBB");
        log.append(&a, "alice", "one");
        log.append(&b, "bob", "two");

        log.clear(&a);

        assert!(log.read(&a).is_empty());
        assert_eq!(log.read(&b).len(), 1);
        assert_eq!(log.total(), 1);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let mut log = MessageLog::new();
        let code = RoomCode::from_string("ABCDE");
        let msg = log.append(&code, "alice", "hi").unwrap();

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["roomCode"], "ABCDE");
        assert_eq!(json["sender"], "alice");
        assert!(json["timestamp"].is_string());
    }
}
