//! Participant state held by a room

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::connection::{ParticipantEvent, ParticipantLink};

/// Participant identifier, unique within a room
pub type ParticipantId = Uuid;

/// Public view of a participant, sent to the host on join and to everyone on round start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    /// Opaque game-defined payload
    pub properties: Value,
}

/// A connected participant and their per-room state
#[derive(Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub properties: Value,
    /// Popularity score in [0, 1]
    pub quality: f64,
    pub money: f64,
    /// Set once the participant is done with the current round
    pub finished: bool,
    /// Join order within the room, assigned by the room on join
    pub(crate) joined_seq: u64,
    connection: ParticipantLink,
}

impl Participant {
    pub fn new(name: String, properties: Value, quality: f64, connection: ParticipantLink) -> Self {
        Self::with_id(Uuid::new_v4(), name, properties, quality, connection)
    }

    pub fn with_id(
        id: ParticipantId,
        name: String,
        properties: Value,
        quality: f64,
        connection: ParticipantLink,
    ) -> Self {
        Self {
            id,
            name,
            properties,
            quality: quality.clamp(0.0, 1.0),
            money: 0.0,
            finished: false,
            joined_seq: 0,
            connection,
        }
    }

    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id,
            name: self.name.clone(),
            properties: self.properties.clone(),
        }
    }

    /// Push an event to this participant's connection
    pub fn send(&self, event: ParticipantEvent) {
        self.connection.send(event);
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("quality", &self.quality)
            .field("money", &self.money)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
