//! Connection seam between rooms and the transport layer
//!
//! A room never touches sockets. It holds one link for the host and one per
//! participant and pushes typed events through them. Delivery is
//! fire-and-forget: implementations drop events for dead connections.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::participant::{ParticipantId, ParticipantInfo};

/// Something that can deliver events of type `E` to one destination
pub trait Connection<E>: Send + Sync {
    fn send(&self, event: E);
}

/// Link to a room's host
pub type HostLink = Arc<dyn Connection<HostEvent>>;

/// Link to a single participant
pub type ParticipantLink = Arc<dyn Connection<ParticipantEvent>>;

/// Events a room pushes to its host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// A participant joined
    Join { participant: ParticipantInfo },
    /// A participant left or disconnected
    Leave { participant_id: ParticipantId },
    /// Ownership changed (None when the room emptied)
    Owner { owner_id: Option<ParticipantId> },
    /// A participant reported the current round as done
    Finished { participant_id: ParticipantId },
    /// The room was evicted from the registry
    Closed,
}

/// Events a room pushes to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ParticipantEvent {
    /// You are now the room owner
    Owner,
    Cutscene,
    /// Your quality after a head-to-head
    Popularity { quality: f64 },
    /// Round start snapshot of everyone in the room
    StartRound {
        players: Vec<ParticipantInfo>,
        suppress_clear: bool,
    },
    Message { payload: Value },
    Callback { payload: Value },
    /// Your money after the round was scored
    Money { money: f64 },
    /// The host went away; the room is gone
    Disconnect,
}
