//! Room: one host, many participants, a sequence of rounds
//!
//! The host drives the room through [`HostCommand`]s. Participants only join,
//! leave and mark themselves finished. Every handler runs to completion
//! against `&mut Room`, so callers serialize access with a lock per room.
//!
//! Ownership is first-among-equals: the first participant to join owns the
//! room, and when the owner leaves it passes to the longest-standing
//! remaining participant.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RoomConfig;
use crate::connection::{HostEvent, HostLink, ParticipantEvent};
use crate::ids::generate_host_secret;
use crate::invariants::assert_room_invariants;
use crate::participant::{Participant, ParticipantId};
use crate::population::{Population, TraitDrift, VotingEngine};

/// Quality movement applied when both contenders are rated equally
const MIN_POPULARITY_DELTA: f64 = 0.1;

/// One participant's line in the end-of-round results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResult {
    pub votes: u32,
    /// Money earned this round
    pub made: f64,
    pub name: String,
    /// Running total after this round
    pub money: f64,
    pub properties: Value,
}

/// Results of a round, keyed by participant
pub type RoundResults = HashMap<ParticipantId, ParticipantResult>;

/// Host acknowledgment channel for `EndRound`
pub type ResultCallback = Box<dyn FnOnce(RoundResults) + Send>;

/// Commands the host issues to its room
pub enum HostCommand {
    GameStarted,
    Cutscene,
    /// Head-to-head outcome; adjusts both contenders' popularity
    RoundResult {
        winner: ParticipantId,
        loser: ParticipantId,
    },
    StartRound {
        suppress_clear: bool,
    },
    /// Relay a payload; `None` broadcasts
    Message {
        payload: Value,
        to: Option<Vec<ParticipantId>>,
    },
    /// Relay a payload; `None` targets every current participant
    Callback {
        payload: Value,
        to: Option<Vec<ParticipantId>>,
    },
    EndRound(ResultCallback),
    HostDisconnected,
}

impl fmt::Debug for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::GameStarted => f.write_str("GameStarted"),
            HostCommand::Cutscene => f.write_str("Cutscene"),
            HostCommand::RoundResult { winner, loser } => f
                .debug_struct("RoundResult")
                .field("winner", winner)
                .field("loser", loser)
                .finish(),
            HostCommand::StartRound { suppress_clear } => f
                .debug_struct("StartRound")
                .field("suppress_clear", suppress_clear)
                .finish(),
            HostCommand::Message { to, .. } => {
                f.debug_struct("Message").field("to", to).finish_non_exhaustive()
            }
            HostCommand::Callback { to, .. } => {
                f.debug_struct("Callback").field("to", to).finish_non_exhaustive()
            }
            HostCommand::EndRound(_) => f.write_str("EndRound"),
            HostCommand::HostDisconnected => f.write_str("HostDisconnected"),
        }
    }
}

/// What the caller should do with the room after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The host is gone; drop the room from the registry
    Close,
}

/// Snapshot for listings and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub code: String,
    pub participants: usize,
    pub owner: Option<ParticipantId>,
    pub in_game: bool,
    pub has_host: bool,
    pub created_at: DateTime<Utc>,
}

/// Popularity movement for a head-to-head between qualities `w` and `l`
pub fn popularity_delta(w: f64, l: f64) -> f64 {
    let delta = (w - l).abs() / 3.0;
    if delta == 0.0 {
        MIN_POPULARITY_DELTA
    } else {
        delta
    }
}

/// New (winner, loser) qualities after a head-to-head
pub fn adjust_popularity(w: f64, l: f64) -> (f64, f64) {
    let delta = popularity_delta(w, l);
    ((w + delta).min(1.0), (l - delta).max(0.0))
}

pub struct Room {
    id: String,
    host_secret: String,
    host: Option<HostLink>,
    in_game: bool,
    participants: HashMap<ParticipantId, Participant>,
    owner: Option<ParticipantId>,
    population: Box<dyn VotingEngine>,
    drift_magnitude: f64,
    next_seq: u64,
    created_at: DateTime<Utc>,
    last_activity: Instant,
}

impl Room {
    /// Create a room with a fresh host secret and population
    pub fn new(id: String, config: &RoomConfig) -> Self {
        Self::with_engine(id, config, Box::new(Population::new(config.population_capacity)))
    }

    pub fn with_engine(id: String, config: &RoomConfig, population: Box<dyn VotingEngine>) -> Self {
        Self {
            id,
            host_secret: generate_host_secret(),
            host: None,
            in_game: false,
            participants: HashMap::new(),
            owner: None,
            population,
            drift_magnitude: config.drift_magnitude,
            next_seq: 0,
            created_at: Utc::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host_secret(&self) -> &str {
        &self.host_secret
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    pub fn in_game(&self) -> bool {
        self.in_game
    }

    pub fn owner(&self) -> Option<ParticipantId> {
        self.owner
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the last handled event
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.id.clone(),
            participants: self.participants.len(),
            owner: self.owner,
            in_game: self.in_game,
            has_host: self.host.is_some(),
            created_at: self.created_at,
        }
    }

    /// Bind the room's host
    pub fn set_host(&mut self, host: HostLink) {
        if self.host.is_some() {
            warn!(room = %self.id, "Rebinding host of a room that already has one");
        }
        self.host = Some(host);
        self.touch();
        info!(room = %self.id, "Host bound");
    }

    /// Apply one host command
    pub fn handle(&mut self, command: HostCommand) -> Flow {
        self.touch();
        let flow = match command {
            HostCommand::GameStarted => {
                self.in_game = true;
                info!(room = %self.id, participants = self.participants.len(), "Game started");
                Flow::Continue
            }
            HostCommand::Cutscene => {
                self.broadcast(ParticipantEvent::Cutscene);
                Flow::Continue
            }
            HostCommand::RoundResult { winner, loser } => {
                self.record_head_to_head(winner, loser);
                Flow::Continue
            }
            HostCommand::StartRound { suppress_clear } => {
                let players = self.participants.values().map(Participant::info).collect();
                self.broadcast(ParticipantEvent::StartRound {
                    players,
                    suppress_clear,
                });
                Flow::Continue
            }
            HostCommand::Message { payload, to } => {
                let event = ParticipantEvent::Message { payload };
                match to {
                    Some(ids) => self.deliver(&ids, event),
                    None => self.broadcast(event),
                }
                Flow::Continue
            }
            HostCommand::Callback { payload, to } => {
                let ids = to.unwrap_or_else(|| self.participant_ids());
                self.deliver(&ids, ParticipantEvent::Callback { payload });
                Flow::Continue
            }
            HostCommand::EndRound(reply) => {
                self.end_round(reply);
                Flow::Continue
            }
            HostCommand::HostDisconnected => {
                info!(room = %self.id, "Host disconnected, closing room");
                self.broadcast(ParticipantEvent::Disconnect);
                Flow::Close
            }
        };
        assert_room_invariants(self);
        flow
    }

    /// Add a participant; the first one in an ownerless room becomes owner
    pub fn join(&mut self, mut participant: Participant) {
        self.touch();
        let id = participant.id;
        participant.joined_seq = self.next_seq;
        self.next_seq += 1;

        let info = participant.info();
        self.participants.insert(id, participant);
        self.send_host(HostEvent::Join { participant: info });
        debug!(room = %self.id, participant_id = %id, "Participant joined");

        if self.owner.is_none() {
            self.owner = Some(id);
            self.send_host(HostEvent::Owner { owner_id: Some(id) });
            self.send_to(id, ParticipantEvent::Owner);
        }

        assert_room_invariants(self);
    }

    /// Remove a participant, handing ownership on if they held it
    pub fn leave(&mut self, id: ParticipantId) {
        self.touch();
        if self.participants.remove(&id).is_none() {
            debug!(room = %self.id, participant_id = %id, "Leave for unknown participant");
            return;
        }
        self.send_host(HostEvent::Leave { participant_id: id });
        debug!(room = %self.id, participant_id = %id, "Participant left");

        if self.owner == Some(id) {
            self.owner = self
                .participants
                .values()
                .min_by_key(|p| p.joined_seq)
                .map(|p| p.id);
            self.send_host(HostEvent::Owner {
                owner_id: self.owner,
            });
            if let Some(next) = self.owner {
                self.send_to(next, ParticipantEvent::Owner);
            }
        }

        assert_room_invariants(self);
    }

    /// Participant reports the current round as done
    pub fn mark_finished(&mut self, id: ParticipantId) {
        self.touch();
        match self.participants.get_mut(&id) {
            Some(p) => p.finished = true,
            None => {
                debug!(room = %self.id, participant_id = %id, "Finished from unknown participant");
                return;
            }
        }
        self.send_host(HostEvent::Finished { participant_id: id });
    }

    /// Tell everyone the room is going away without a host disconnect
    pub fn close(&mut self) {
        self.broadcast(ParticipantEvent::Disconnect);
        self.send_host(HostEvent::Closed);
    }

    fn record_head_to_head(&mut self, winner: ParticipantId, loser: ParticipantId) {
        let (Some(w), Some(l)) = (
            self.participants.get(&winner).map(|p| p.quality),
            self.participants.get(&loser).map(|p| p.quality),
        ) else {
            debug!(room = %self.id, %winner, %loser, "Round result for unknown participant");
            return;
        };

        if winner == loser {
            // Gain then loss, applied in turn to the one participant
            let delta = popularity_delta(w, l);
            if let Some(p) = self.participants.get_mut(&winner) {
                p.quality = ((p.quality + delta).min(1.0) - delta).max(0.0);
            }
        } else {
            let (new_w, new_l) = adjust_popularity(w, l);
            if let Some(p) = self.participants.get_mut(&winner) {
                p.quality = new_w;
            }
            if let Some(p) = self.participants.get_mut(&loser) {
                p.quality = new_l;
            }
        }

        for id in [winner, loser] {
            if let Some(p) = self.participants.get(&id) {
                p.send(ParticipantEvent::Popularity { quality: p.quality });
            }
        }
    }

    fn end_round(&mut self, reply: ResultCallback) {
        let tallies = self.population.vote(&self.participants);

        for p in self.participants.values_mut() {
            p.finished = false;
        }

        let mut results = RoundResults::with_capacity(tallies.len());
        for (id, tally) in tallies {
            let Some(p) = self.participants.get_mut(&id) else {
                debug!(room = %self.id, participant_id = %id, "Tally for unknown participant");
                continue;
            };
            p.money += tally.made;
            p.send(ParticipantEvent::Money { money: p.money });
            results.insert(
                id,
                ParticipantResult {
                    votes: tally.votes,
                    made: tally.made,
                    name: p.name.clone(),
                    money: p.money,
                    properties: p.properties.clone(),
                },
            );
        }

        let drift = TraitDrift::random(&mut rand::thread_rng(), self.drift_magnitude);
        self.population.next_generation(drift);

        debug!(room = %self.id, scored = results.len(), "Round ended");
        reply(results);
    }

    fn send_host(&self, event: HostEvent) {
        match &self.host {
            Some(host) => host.send(event),
            None => debug!(room = %self.id, "No host bound, dropping host event"),
        }
    }

    fn send_to(&self, id: ParticipantId, event: ParticipantEvent) {
        if let Some(p) = self.participants.get(&id) {
            p.send(event);
        }
    }

    fn broadcast(&self, event: ParticipantEvent) {
        for p in self.participants.values() {
            p.send(event.clone());
        }
    }

    /// Deliver to the listed participants, skipping ids not in the room
    fn deliver(&self, ids: &[ParticipantId], event: ParticipantEvent) {
        for id in ids {
            match self.participants.get(id) {
                Some(p) => p.send(event.clone()),
                None => debug!(room = %self.id, participant_id = %id, "Skipping delivery to unknown participant"),
            }
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: Duration) {
        if let Some(then) = Instant::now().checked_sub(by) {
            self.last_activity = then;
        }
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("in_game", &self.in_game)
            .field("owner", &self.owner)
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}
