use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const CODE_LEN: usize = 5;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Backlog per room group; a receiver more than this far behind starts
/// dropping its oldest records instead of stalling the senders.
const GROUP_BUFFER: usize = 256;

/// One fan-out record, both chat content and entered/left notifications.
/// Serializes as `{"name": ..., "message": ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub name: String,
    pub message: String,
}

impl MessageRecord {
    pub fn chat(name: &str, body: String) -> Self {
        Self { name: name.to_owned(), message: body }
    }

    pub fn entered(name: &str) -> Self {
        Self { name: name.to_owned(), message: "has entered the room".to_owned() }
    }

    pub fn left(name: &str) -> Self {
        Self { name: name.to_owned(), message: "has left the room".to_owned() }
    }
}

struct RoomState {
    members: usize,
    messages: Vec<MessageRecord>,
    group: broadcast::Sender<MessageRecord>,
}

impl RoomState {
    fn new() -> Self {
        Self {
            members: 0,
            messages: Vec::new(),
            group: broadcast::channel(GROUP_BUFFER).0,
        }
    }
}

/// Process-wide map from room code to live room state. All mutation goes
/// through one lock, so same-room updates never interleave; in particular a
/// decrement that hits zero removes the room in the same critical section.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomState>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random uppercase code of the given length, regenerated until it does
    /// not collide with an active room.
    pub fn generate_code(&self, length: usize) -> String {
        let rooms = self.rooms.lock().unwrap();
        fresh_code(&rooms, length)
    }

    pub fn create_room(&self) -> String {
        let mut rooms = self.rooms.lock().unwrap();
        let code = fresh_code(&rooms, CODE_LEN);
        rooms.insert(code.clone(), RoomState::new());
        code
    }

    pub fn room_exists(&self, code: &str) -> bool {
        self.rooms.lock().unwrap().contains_key(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }

    pub fn member_count(&self, code: &str) -> Option<usize> {
        self.rooms.lock().unwrap().get(code).map(|room| room.members)
    }

    /// Snapshot of the room's log, empty if the room is gone.
    pub fn messages(&self, code: &str) -> Vec<MessageRecord> {
        self.rooms
            .lock()
            .unwrap()
            .get(code)
            .map(|room| room.messages.clone())
            .unwrap_or_default()
    }

    /// No-op if the room was deleted in the meantime.
    pub fn append_message(&self, code: &str, record: MessageRecord) {
        if let Some(room) = self.rooms.lock().unwrap().get_mut(code) {
            room.messages.push(record);
        }
    }

    pub fn increment_members(&self, code: &str) {
        if let Some(room) = self.rooms.lock().unwrap().get_mut(code) {
            room.members += 1;
        }
    }

    /// Drops the count and deletes the room once it reaches zero. Calling
    /// this on an absent code is a no-op.
    pub fn decrement_members(&self, code: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        drop_member(&mut rooms, code);
    }

    pub fn subscribe(&self, code: &str) -> Option<broadcast::Receiver<MessageRecord>> {
        self.rooms
            .lock()
            .unwrap()
            .get(code)
            .map(|room| room.group.subscribe())
    }

    /// Connect path: subscribe, count the member, announce them. The
    /// subscription happens first, so the joiner hears its own announcement.
    /// Returns `None` if the room vanished since the join was validated.
    pub fn join(&self, code: &str, name: &str) -> Option<broadcast::Receiver<MessageRecord>> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(code)?;
        let feed = room.group.subscribe();
        room.members += 1;
        let _ = room.group.send(MessageRecord::entered(name));
        Some(feed)
    }

    /// Disconnect path: drop the member and, if the room survives, announce
    /// the departure to whoever is still in it.
    pub fn leave(&self, code: &str, name: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        if drop_member(&mut rooms, code) {
            if let Some(room) = rooms.get(code) {
                let _ = room.group.send(MessageRecord::left(name));
            }
        }
    }

    /// Fan a record out to the room's group and append it to the log in one
    /// critical section, so delivery order and log order agree. Silently
    /// drops the record if the room is gone.
    pub fn publish(&self, code: &str, record: MessageRecord) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(code) else {
            return;
        };
        let _ = room.group.send(record.clone());
        room.messages.push(record);
    }
}

fn fresh_code(rooms: &HashMap<String, RoomState>, length: usize) -> String {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        if !rooms.contains_key(&code) {
            return code;
        }
    }
}

/// Returns whether the room still exists afterwards.
fn drop_member(rooms: &mut HashMap<String, RoomState>, code: &str) -> bool {
    let Some(room) = rooms.get_mut(code) else {
        return false;
    };
    room.members = room.members.saturating_sub(1);
    if room.members == 0 {
        rooms.remove(code);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_uppercase_of_requested_length() {
        let registry = RoomRegistry::new();
        for length in 1..=8 {
            let code = registry.generate_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn generated_code_avoids_active_rooms() {
        let registry = RoomRegistry::new();
        let taken: Vec<String> = (0..50).map(|_| registry.create_room()).collect();
        for _ in 0..100 {
            let code = registry.generate_code(CODE_LEN);
            assert!(!taken.contains(&code));
        }
    }

    #[test]
    fn create_room_starts_empty() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        assert_eq!(code.len(), CODE_LEN);
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.member_count(&code), Some(0));
        assert!(registry.messages(&code).is_empty());
    }

    #[test]
    fn sequential_creation_yields_distinct_codes() {
        let registry = RoomRegistry::new();
        let mut codes: Vec<String> = (0..200).map(|_| registry.create_room()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 200);
    }

    #[test]
    fn decrement_to_zero_deletes_the_room() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        registry.increment_members(&code);
        assert_eq!(registry.member_count(&code), Some(1));
        registry.decrement_members(&code);
        assert!(!registry.room_exists(&code));
    }

    #[test]
    fn decrement_on_missing_room_is_a_noop() {
        let registry = RoomRegistry::new();
        registry.decrement_members("QQQQQ");
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn append_on_missing_room_is_a_noop() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        registry.append_message("QQQQQ", MessageRecord::chat("ghost", "boo".into()));
        assert!(registry.messages("QQQQQ").is_empty());
        assert!(registry.messages(&code).is_empty());
    }

    #[test]
    fn appended_messages_keep_arrival_order() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        registry.append_message(&code, MessageRecord::chat("a", "first".into()));
        registry.append_message(&code, MessageRecord::chat("b", "second".into()));
        let log = registry.messages(&code);
        assert_eq!(log[0].message, "first");
        assert_eq!(log[1].message, "second");
    }

    #[test]
    fn publish_delivers_to_subscribers_and_logs() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        let mut feed = registry.subscribe(&code).unwrap();
        let record = MessageRecord::chat("ann", "hello".into());
        registry.publish(&code, record.clone());
        assert_eq!(feed.try_recv().unwrap(), record);
        assert_eq!(registry.messages(&code), vec![record]);
    }

    #[test]
    fn publish_on_missing_room_drops_the_record() {
        let registry = RoomRegistry::new();
        registry.publish("QQQQQ", MessageRecord::chat("ghost", "boo".into()));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn join_counts_and_announces_including_the_joiner() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        let mut feed = registry.join(&code, "Bob").unwrap();
        assert_eq!(registry.member_count(&code), Some(1));
        assert_eq!(feed.try_recv().unwrap(), MessageRecord::entered("Bob"));
    }

    #[test]
    fn join_on_missing_room_fails() {
        let registry = RoomRegistry::new();
        assert!(registry.join("QQQQQ", "Bob").is_none());
    }

    #[test]
    fn leave_announces_to_remaining_members_only() {
        let registry = RoomRegistry::new();
        let code = registry.create_room();
        let mut ann = registry.join(&code, "Ann").unwrap();
        let _bob = registry.join(&code, "Bob").unwrap();
        // drain the entered notifications
        while ann.try_recv().is_ok() {}

        registry.leave(&code, "Bob");
        assert_eq!(ann.try_recv().unwrap(), MessageRecord::left("Bob"));
        assert_eq!(registry.member_count(&code), Some(1));

        registry.leave(&code, "Ann");
        assert!(!registry.room_exists(&code));
    }

    #[test]
    fn leave_on_missing_room_is_a_noop() {
        let registry = RoomRegistry::new();
        registry.leave("QQQQQ", "Bob");
        assert_eq!(registry.room_count(), 0);
    }
}
