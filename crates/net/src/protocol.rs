//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.
//! A connection's first message decides its role: `CreateRoom` makes it the
//! host of a new room, `JoinRoom` makes it a participant of an existing one.

use hustings_core::{HostEvent, ParticipantEvent, ParticipantId, RoundResults};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open a new room and become its host
    CreateRoom,

    /// Join an existing room as a participant
    JoinRoom {
        code: String,
        name: String,
        #[serde(default)]
        properties: Value,
    },

    /// Host: the game has begun
    GameStarted,

    /// Host: play a cutscene on every participant
    Cutscene,

    /// Host: outcome of a head-to-head
    RoundResult {
        winner: ParticipantId,
        loser: ParticipantId,
    },

    /// Host: start a round
    StartRound {
        #[serde(default)]
        suppress_clear: bool,
    },

    /// Host: relay a payload, to everyone unless `to` is given
    Message {
        payload: Value,
        #[serde(default)]
        to: Option<Vec<ParticipantId>>,
    },

    /// Host: relay a callback payload
    Callback {
        payload: Value,
        #[serde(default)]
        to: Option<Vec<ParticipantId>>,
    },

    /// Host: score the round; answered with `RoundResults`
    EndRound { request_id: u64 },

    /// Participant: done with the current round
    Finished,

    /// Keep-alive
    Ping,
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Room created; the receiver is its host
    RoomCreated { code: String, host_secret: String },

    /// Join accepted
    Joined {
        code: String,
        participant_id: ParticipantId,
        quality: f64,
    },

    /// Join refused
    JoinRejected { reason: String },

    /// Event for a host
    Host(HostEvent),

    /// Event for a participant
    Participant(ParticipantEvent),

    /// Answer to `EndRound`
    RoundResults {
        request_id: u64,
        results: RoundResults,
    },

    /// Request could not be served
    Error { reason: String },

    Pong,
}

impl ClientMessage {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl ServerMessage {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_join_request_defaults() {
        let msg = ClientMessage::from_bytes(br#"{"type":"JoinRoom","code":"ABCD","name":"ana"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                code: "ABCD".into(),
                name: "ana".into(),
                properties: Value::Null,
            }
        );
    }

    #[test]
    fn test_targeted_message_parses() {
        let id = Uuid::new_v4();
        let raw = json!({ "type": "Message", "payload": { "q": 1 }, "to": [id] });
        let msg = ClientMessage::from_bytes(raw.to_string().as_bytes()).unwrap();
        match msg {
            ClientMessage::Message { payload, to } => {
                assert_eq!(payload["q"], 1);
                assert_eq!(to, Some(vec![id]));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_nested_event_tags() {
        let msg = ServerMessage::Participant(ParticipantEvent::Money { money: 12.5 });
        let value: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "Participant", "event": "Money", "money": 12.5 }));

        let decoded = ServerMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ClientMessage::from_bytes(br#"{"type":"Teleport"}"#).is_err());
    }
}
