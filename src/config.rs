//! Configuration for the REPS dual optimizer and the episodic agent.
//!
//! Every numeric constant the optimizer depends on (KL bound, solver
//! tolerances, the lower bound on η) lives here and is handed to the
//! optimizer at construction. Configurations can be written by hand as JSON:
//!
//! ```json
//! {
//!   "eps": 0.5,
//!   "gamma": 1.0,
//!   "solver": { "eta_init": 1.0, "max_iter": 200 },
//!   "on_nonconvergence": "strict"
//! }
//! ```

use crate::error::{RepsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do when the dual solver stops without meeting its tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConvergencePolicy {
    /// Fail the update with `RepsError::SolverNonConvergence`.
    #[default]
    Strict,
    /// Log a warning and use the last iterate.
    BestEffort,
}

/// Tolerances and bounds for the 1-D dual solver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Starting value for η
    pub eta_init: f64,

    /// Lower bound on η (the dual is undefined at 0)
    pub min_eta: f64,

    /// Stop once |dual'(η)| falls below this value
    pub grad_tol: f64,

    /// Stop once the bracket's relative width falls below this value
    pub x_tol: f64,

    /// Maximum number of gradient evaluations
    pub max_iter: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            eta_init: 1.0,
            min_eta: f32::EPSILON as f64,
            grad_tol: 1e-10,
            x_tol: 1e-12,
            max_iter: 500,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_eta.is_finite() && self.min_eta > 0.0) {
            return Err(RepsError::InvalidConfig(format!(
                "min_eta must be finite and > 0, got {}",
                self.min_eta
            )));
        }
        if !(self.eta_init.is_finite() && self.eta_init > 0.0) {
            return Err(RepsError::InvalidConfig(format!(
                "eta_init must be finite and > 0, got {}",
                self.eta_init
            )));
        }
        if !(self.grad_tol.is_finite() && self.grad_tol > 0.0) {
            return Err(RepsError::InvalidConfig("grad_tol must be > 0".to_string()));
        }
        if !(self.x_tol.is_finite() && self.x_tol > 0.0) {
            return Err(RepsError::InvalidConfig("x_tol must be > 0".to_string()));
        }
        if self.max_iter == 0 {
            return Err(RepsError::InvalidConfig("max_iter must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Configuration for episodic REPS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepsConfig {
    /// KL bound ε between successive search distributions
    pub eps: f64,

    /// Discount factor γ ∈ [0, 1] used to turn episode rewards into returns
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub on_nonconvergence: ConvergencePolicy,
}

fn default_gamma() -> f64 {
    1.0
}

impl RepsConfig {
    /// Create a configuration with the given KL bound and defaults elsewhere
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            gamma: default_gamma(),
            solver: SolverConfig::default(),
            on_nonconvergence: ConvergencePolicy::default(),
        }
    }

    /// Conservative steps: small KL bound, undiscounted returns
    pub fn conservative() -> Self {
        Self::new(0.1)
    }

    /// Aggressive steps: large KL bound, undiscounted returns
    pub fn aggressive() -> Self {
        Self::new(1.0)
    }

    /// Load a configuration from a JSON file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let cfg: RepsConfig = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(RepsError::InvalidBound(self.eps));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(RepsError::InvalidConfig(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        self.solver.validate()
    }
}

impl Default for RepsConfig {
    fn default() -> Self {
        Self::new(0.5)
    }
}
