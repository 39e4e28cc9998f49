//! Room configuration
//!
//! Loaded from the `[room]` table of the server config file. Every field has
//! a default, so an empty table is valid.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::population::DEFAULT_CAPACITY;

/// Tunables applied to every room created by a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Number of simulated voters in each room's population
    pub population_capacity: usize,
    /// Quality assigned to a participant when they join
    pub initial_quality: f64,
    /// Hard cap on participants per room (unbounded when unset)
    pub max_participants: Option<usize>,
    /// Refuse joins once the host has started the game
    pub reject_join_in_game: bool,
    /// Bound of the uniform trait drift applied after each round
    pub drift_magnitude: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            population_capacity: DEFAULT_CAPACITY,
            initial_quality: 0.5,
            max_participants: None,
            reject_join_in_game: true,
            drift_magnitude: 0.05,
        }
    }
}

impl RoomConfig {
    /// Reject values the room logic cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_quality) {
            return Err(Error::Config(format!(
                "initial_quality must be within [0, 1], got {}",
                self.initial_quality
            )));
        }

        if !self.drift_magnitude.is_finite() || self.drift_magnitude < 0.0 {
            return Err(Error::Config(format!(
                "drift_magnitude must be a non-negative number, got {}",
                self.drift_magnitude
            )));
        }

        if self.max_participants == Some(0) {
            return Err(Error::Config("max_participants must be at least 1".into()));
        }

        Ok(())
    }
}
