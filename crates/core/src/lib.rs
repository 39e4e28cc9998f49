//! Hustings Core Library
//!
//! Rooms, participants, the ownership protocol, popularity scoring and the
//! room registry for Hustings party games.

pub mod config;
pub mod connection;
pub mod error;
pub mod ids;
pub mod invariants;
pub mod participant;
pub mod population;
pub mod registry;
pub mod room;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RoomConfig;
pub use connection::{Connection, HostEvent, HostLink, ParticipantEvent, ParticipantLink};
pub use error::{Error, Result};
pub use participant::{Participant, ParticipantId, ParticipantInfo};
pub use population::{Population, Tally, TraitDrift, VotingEngine};
pub use registry::{lock_room, RoomRegistry, SharedRoom};
pub use room::{
    adjust_popularity, popularity_delta, Flow, HostCommand, ParticipantResult, ResultCallback,
    Room, RoundResults, RoomSummary,
};
