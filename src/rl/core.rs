// Core Episodic Types
//
// Black-box policy search treats one episode as one sample: a policy
// parameter vector θ drawn at episode start, scored by the return the
// policy collects with it.

use serde::{Deserialize, Serialize};

/// Episode trajectory for parameter-space policy search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    /// Policy parameters used for the whole episode
    pub theta: Vec<f64>,

    /// Rewards received, in order
    pub rewards: Vec<f64>,
}

impl Episode {
    /// Create a new empty episode for the given parameters
    pub fn new(theta: Vec<f64>) -> Self {
        Self {
            theta,
            rewards: Vec::new(),
        }
    }

    /// Create an episode from an already collected reward sequence
    pub fn with_rewards(theta: Vec<f64>, rewards: Vec<f64>) -> Self {
        Self { theta, rewards }
    }

    /// Add a step's reward to the episode
    pub fn add_reward(&mut self, reward: f64) {
        self.rewards.push(reward);
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Undiscounted sum of rewards
    pub fn total_return(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// Discounted return Σ γ^t r_t
    pub fn discounted_return(&self, gamma: f64) -> f64 {
        self.rewards
            .iter()
            .rev()
            .fold(0.0, |acc, r| r + gamma * acc)
    }
}

/// Discounted return of every episode, in order
pub fn compute_returns(episodes: &[Episode], gamma: f64) -> Vec<f64> {
    episodes.iter().map(|ep| ep.discounted_return(gamma)).collect()
}

// =============================================================================
// Tests
// =============================================================================
