//! Room registry - process-wide lookup from room code to room
//!
//! Rooms are created here and live until their host disconnects or they are
//! evicted for idleness. Each room sits behind its own mutex. The map lock and
//! a room lock are never held at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::RoomConfig;
use crate::connection::HostLink;
use crate::error::{Error, Result};
use crate::ids::generate_room_code;
use crate::participant::{Participant, ParticipantId};
use crate::population::{Population, VotingEngine};
use crate::room::{Flow, HostCommand, Room, RoomSummary};

/// A room shared between the registry and the connections driving it
pub type SharedRoom = Arc<Mutex<Room>>;

/// Lock a room, recovering the guard if a previous holder panicked
pub fn lock_room(room: &SharedRoom) -> MutexGuard<'_, Room> {
    room.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registry - central store of live rooms
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedRoom>>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Create a room with a fresh population, already bound to its host
    pub fn create(&self, host: HostLink) -> (String, String, SharedRoom) {
        let engine = Box::new(Population::new(self.config.population_capacity));
        self.create_with_engine(host, engine)
    }

    /// Create a room around a given voting engine
    ///
    /// The host is bound before the room becomes reachable by code, so no
    /// join can land in a room without a host. Returns the room code, the
    /// host secret, and the room itself.
    pub fn create_with_engine(&self, host: HostLink, engine: Box<dyn VotingEngine>) -> (String, String, SharedRoom) {
        let mut rooms = self.write();
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let mut room = Room::with_engine(code.clone(), &self.config, engine);
        room.set_host(host);
        let secret = room.host_secret().to_string();
        let shared = Arc::new(Mutex::new(room));
        rooms.insert(code.clone(), shared.clone());

        info!(room = %code, total = rooms.len(), "Room created");
        (code, secret, shared)
    }

    /// Get a room by code
    pub fn get(&self, code: &str) -> Option<SharedRoom> {
        self.read().get(code).cloned()
    }

    /// Check if a room exists
    pub fn contains(&self, code: &str) -> bool {
        self.read().contains_key(code)
    }

    /// Remove a room by code
    pub fn remove(&self, code: &str) -> Option<SharedRoom> {
        let removed = self.write().remove(code);
        if removed.is_some() {
            info!(room = %code, "Room removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All live room codes
    pub fn codes(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms_snapshot()
            .iter()
            .map(|room| lock_room(room).summary())
            .collect()
    }

    /// Bind the host of a room
    pub fn bind_host(&self, code: &str, host: HostLink) -> Result<()> {
        let room = self.require(code)?;
        lock_room(&room).set_host(host);
        Ok(())
    }

    /// Run a host command against the room registered under `code`
    pub fn dispatch(&self, code: &str, command: HostCommand) -> Result<Flow> {
        let room = self.require(code)?;
        self.dispatch_room(&room, command)
    }

    /// Run a host command against a room held by its host connection
    ///
    /// Fails with `RoomNotFound` once the room has left the registry, even if
    /// its code now belongs to another room. On `Flow::Close` only this room
    /// is removed.
    pub fn dispatch_room(&self, room: &SharedRoom, command: HostCommand) -> Result<Flow> {
        let id = lock_room(room).id().to_string();
        if !self.is_registered(&id, room) {
            return Err(Error::RoomNotFound(id));
        }
        let flow = lock_room(room).handle(command);

        if flow == Flow::Close {
            self.remove_room(&id, room);
        }
        Ok(flow)
    }

    /// Add a participant to a room
    pub fn join(&self, code: &str, participant: Participant) -> Result<()> {
        let room = self.require(code)?;
        let mut guard = lock_room(&room);

        if guard.in_game() && self.config.reject_join_in_game {
            return Err(Error::GameInProgress(code.to_string()));
        }
        if let Some(capacity) = self.config.max_participants {
            if guard.len() >= capacity {
                return Err(Error::RoomFull {
                    code: code.to_string(),
                    capacity,
                });
            }
        }

        guard.join(participant);
        Ok(())
    }

    /// Remove a participant; a vanished room is not an error
    pub fn leave(&self, code: &str, id: ParticipantId) {
        match self.get(code) {
            Some(room) => lock_room(&room).leave(id),
            None => debug!(room = %code, participant_id = %id, "Leave for a room that is gone"),
        }
    }

    /// Mark a participant finished; a vanished room is not an error
    pub fn mark_finished(&self, code: &str, id: ParticipantId) {
        if let Some(room) = self.get(code) {
            lock_room(&room).mark_finished(id);
        }
    }

    /// Remove rooms idle for longer than `max_idle`, telling their members
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let entries: Vec<(String, SharedRoom)> = self
            .read()
            .iter()
            .map(|(code, room)| (code.clone(), room.clone()))
            .collect();

        let mut evicted = 0;
        for (code, room) in entries {
            if lock_room(&room).idle_for(now) < max_idle {
                continue;
            }
            if self.remove_room(&code, &room) {
                info!(room = %code, "Evicting idle room");
                lock_room(&room).close();
                evicted += 1;
            }
        }
        evicted
    }

    /// Whether `room` is the live entry for `code`
    fn is_registered(&self, code: &str, room: &SharedRoom) -> bool {
        self.read()
            .get(code)
            .is_some_and(|current| Arc::ptr_eq(current, room))
    }

    /// Remove `room` from the map, leaving any other room under its code alone
    fn remove_room(&self, code: &str, room: &SharedRoom) -> bool {
        let mut rooms = self.write();
        if rooms.get(code).is_some_and(|current| Arc::ptr_eq(current, room)) {
            rooms.remove(code);
            info!(room = %code, "Room removed");
            true
        } else {
            false
        }
    }

    fn require(&self, code: &str) -> Result<SharedRoom> {
        self.get(code)
            .ok_or_else(|| Error::RoomNotFound(code.to_string()))
    }

    fn rooms_snapshot(&self) -> Vec<SharedRoom> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SharedRoom>> {
        self.rooms.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SharedRoom>> {
        self.rooms.write().unwrap_or_else(|e| e.into_inner())
    }
}
