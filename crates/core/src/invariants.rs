//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during development.
//! These checks are compiled out in release builds.

use crate::participant::ParticipantId;
use crate::room::Room;

/// Validate that a Room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    // Owner must be a current member, and only an empty room may lack one
    if let Some(owner) = room.owner() {
        debug_assert!(
            room.participant(owner).is_some(),
            "Room {} owner {} is not a participant",
            room.id(),
            owner
        );
    }
    debug_assert!(
        room.owner().is_some() || room.is_empty(),
        "Room {} has {} participants but no owner",
        room.id(),
        room.len()
    );

    for participant in room.participants() {
        assert_quality_in_range(participant.id, participant.quality);
    }
}

/// Validate that a quality score is within [0, 1]
pub fn assert_quality_in_range(id: ParticipantId, quality: f64) {
    debug_assert!(
        (0.0..=1.0).contains(&quality),
        "Participant {} has quality {} outside [0, 1]",
        id,
        quality
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::testing::participant;
    use uuid::Uuid;

    #[test]
    fn test_empty_room() {
        let room = Room::new("ABCD".into(), &RoomConfig::default());
        assert_room_invariants(&room);
    }

    #[test]
    fn test_owned_room() {
        let mut room = Room::new("ABCD".into(), &RoomConfig::default());
        let (a, _) = participant("a", 0.5);
        room.join(a);
        assert_room_invariants(&room);
    }

    #[test]
    fn test_quality_bounds() {
        assert_quality_in_range(Uuid::new_v4(), 0.0);
        assert_quality_in_range(Uuid::new_v4(), 1.0);
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_quality_out_of_range() {
        assert_quality_in_range(Uuid::new_v4(), 1.2);
    }
}
