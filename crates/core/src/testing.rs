//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::connection::{Connection, ParticipantEvent};
use crate::participant::{Participant, ParticipantId};
use crate::population::{Tally, TraitDrift, VotingEngine};

/// Connection that records everything sent to it
pub(crate) struct Recorder<E> {
    events: Mutex<Vec<E>>,
}

impl<E: Clone> Recorder<E> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl<E: Send> Connection<E> for Recorder<E> {
    fn send(&self, event: E) {
        self.events.lock().unwrap().push(event);
    }
}

/// Build a participant wired to a recorder
pub(crate) fn participant(name: &str, quality: f64) -> (Participant, Arc<Recorder<ParticipantEvent>>) {
    let link = Recorder::new();
    let p = Participant::new(name.to_string(), json!({ "label": name }), quality, link.clone());
    (p, link)
}

/// Voting engine returning preset tallies and remembering drifts
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    pub(crate) tallies: HashMap<ParticipantId, Tally>,
    pub(crate) drifts: Arc<Mutex<Vec<TraitDrift>>>,
}

impl VotingEngine for ScriptedEngine {
    fn vote(&mut self, _participants: &HashMap<ParticipantId, Participant>) -> HashMap<ParticipantId, Tally> {
        self.tallies.clone()
    }

    fn next_generation(&mut self, drift: TraitDrift) {
        self.drifts.lock().unwrap().push(drift);
    }
}
