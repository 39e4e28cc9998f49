//! Voting engine seam and the default simulated population
//!
//! A population is a fixed pool of voters, each with four demographic traits
//! in [0, 1]. Participants declare a stance on the same traits through their
//! `properties`. Every voter casts one ballot per round for the participant
//! whose stance sits closest to their own, weighted by quality.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::participant::{Participant, ParticipantId};

/// Default number of voters in a room's population
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Money shared out across all votes each round
const ROUND_PURSE: f64 = 1000.0;

/// Standard deviation of a voter trait around the population mean
const TRAIT_SPREAD: f64 = 0.15;

/// Stance assumed when a participant does not declare one
const NEUTRAL_STANCE: f64 = 0.5;

/// Trait names, in the order they are stored
pub const TRAITS: [&str; 4] = ["ideals", "income", "occupation", "race"];

/// Outcome of one round for one participant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub votes: u32,
    /// Money earned this round
    pub made: f64,
}

/// Per-trait shift applied to the population between rounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TraitDrift {
    pub ideals: f64,
    pub income: f64,
    pub occupation: f64,
    pub race: f64,
}

impl TraitDrift {
    /// Draw each trait independently from `[-magnitude, magnitude]`
    pub fn random<R: Rng>(rng: &mut R, magnitude: f64) -> Self {
        let m = magnitude.abs();
        Self {
            ideals: rng.gen_range(-m..=m),
            income: rng.gen_range(-m..=m),
            occupation: rng.gen_range(-m..=m),
            race: rng.gen_range(-m..=m),
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [self.ideals, self.income, self.occupation, self.race]
    }
}

/// Scores a round and evolves between rounds
pub trait VotingEngine: Send {
    /// Tally votes and money for every participant
    fn vote(&mut self, participants: &HashMap<ParticipantId, Participant>) -> HashMap<ParticipantId, Tally>;

    /// Advance to the next generation of voters
    fn next_generation(&mut self, drift: TraitDrift);
}

/// Simulated electorate
#[derive(Debug)]
pub struct Population {
    capacity: usize,
    means: [f64; 4],
    voters: Vec<[f64; 4]>,
    generation: u64,
    rng: StdRng,
}

impl Population {
    pub fn new(capacity: usize) -> Self {
        Self::from_rng(capacity, StdRng::from_entropy())
    }

    /// Deterministic population, for tests and replays
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::from_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn from_rng(capacity: usize, rng: StdRng) -> Self {
        let mut population = Self {
            capacity,
            means: [NEUTRAL_STANCE; 4],
            voters: Vec::with_capacity(capacity),
            generation: 0,
            rng,
        };
        for _ in 0..capacity {
            let voter = population.sample_voter();
            population.voters.push(voter);
        }
        population
    }

    fn sample_voter(&mut self) -> [f64; 4] {
        let mut voter = self.means;
        for (value, mean) in voter.iter_mut().zip(self.means) {
            *value = match Normal::new(mean, TRAIT_SPREAD) {
                Ok(dist) => dist.sample(&mut self.rng).clamp(0.0, 1.0),
                Err(_) => mean,
            };
        }
        voter
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current trait means, in `TRAITS` order
    pub fn means(&self) -> [f64; 4] {
        self.means
    }
}

/// Read a participant's declared stance from their properties
fn stance(participant: &Participant) -> [f64; 4] {
    TRAITS.map(|name| {
        participant
            .properties
            .get(name)
            .and_then(|v| v.as_f64())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL_STANCE)
    })
}

impl VotingEngine for Population {
    fn vote(&mut self, participants: &HashMap<ParticipantId, Participant>) -> HashMap<ParticipantId, Tally> {
        if participants.is_empty() {
            return HashMap::new();
        }

        // Sorted so ties resolve towards the smaller id
        let mut candidates: Vec<(ParticipantId, f64, [f64; 4])> = participants
            .values()
            .map(|p| (p.id, p.quality, stance(p)))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut votes = vec![0u32; candidates.len()];
        for voter in &self.voters {
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (i, (_, quality, stance)) in candidates.iter().enumerate() {
                let distance: f64 = voter
                    .iter()
                    .zip(stance)
                    .map(|(v, s)| (v - s).abs())
                    .sum::<f64>()
                    / TRAITS.len() as f64;
                let score = quality * (1.0 - distance);
                if score > best_score {
                    best = i;
                    best_score = score;
                }
            }
            votes[best] += 1;
        }

        let per_vote = if self.capacity == 0 {
            0.0
        } else {
            ROUND_PURSE / self.capacity as f64
        };

        candidates
            .iter()
            .zip(votes)
            .map(|((id, _, _), votes)| {
                (
                    *id,
                    Tally {
                        votes,
                        made: votes as f64 * per_vote,
                    },
                )
            })
            .collect()
    }

    fn next_generation(&mut self, drift: TraitDrift) {
        let drift = drift.as_array();

        for (mean, d) in self.means.iter_mut().zip(drift) {
            *mean = (*mean + d).clamp(0.0, 1.0);
        }
        for voter in &mut self.voters {
            for (value, d) in voter.iter_mut().zip(drift) {
                *value = (*value + d).clamp(0.0, 1.0);
            }
        }

        self.generation += 1;
        tracing::debug!(generation = self.generation, means = ?self.means, "Population advanced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::participant;
    use serde_json::json;

    fn roster(entries: Vec<Participant>) -> HashMap<ParticipantId, Participant> {
        entries.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_empty_room_votes_nothing() {
        let mut population = Population::with_seed(100, 1);
        assert!(population.vote(&HashMap::new()).is_empty());
    }

    #[test]
    fn test_every_voter_votes_once() {
        let mut population = Population::with_seed(500, 7);
        let (a, _) = participant("a", 0.5);
        let (b, _) = participant("b", 0.8);
        let (c, _) = participant("c", 0.2);
        let tallies = population.vote(&roster(vec![a, b, c]));

        assert_eq!(tallies.len(), 3);
        let total: u32 = tallies.values().map(|t| t.votes).sum();
        assert_eq!(total, 500);
        let purse: f64 = tallies.values().map(|t| t.made).sum();
        assert!((purse - ROUND_PURSE).abs() < 1e-6);
    }

    #[test]
    fn test_quality_breaks_equal_stances() {
        let mut population = Population::with_seed(200, 3);
        let (strong, _) = participant("strong", 0.9);
        let (weak, _) = participant("weak", 0.1);
        let strong_id = strong.id;
        let weak_id = weak.id;
        let tallies = population.vote(&roster(vec![strong, weak]));

        assert_eq!(tallies[&strong_id].votes, 200);
        assert_eq!(tallies[&weak_id].votes, 0);
        assert_eq!(tallies[&weak_id].made, 0.0);
    }

    #[test]
    fn test_stance_reads_properties() {
        let (mut p, _) = participant("p", 0.5);
        p.properties = json!({ "ideals": 0.9, "income": "lots", "race": 4.0 });
        assert_eq!(stance(&p), [0.9, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_next_generation_shifts_means() {
        let mut population = Population::with_seed(10, 11);
        population.next_generation(TraitDrift {
            ideals: 0.05,
            income: -0.05,
            occupation: 0.0,
            race: 0.6,
        });

        let means = population.means();
        assert!((means[0] - 0.55).abs() < 1e-9);
        assert!((means[1] - 0.45).abs() < 1e-9);
        assert_eq!(means[2], 0.5);
        assert_eq!(means[3], 1.0);
        assert_eq!(population.generation(), 1);
    }

    #[test]
    fn test_random_drift_is_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let drift = TraitDrift::random(&mut rng, 0.05);
            assert!(drift.as_array().iter().all(|d| (-0.05..=0.05).contains(d)));
        }
    }
}
