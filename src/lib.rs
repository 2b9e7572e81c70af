//! Episodic Relative Entropy Policy Search.
//!
//! This crate implements the black-box REPS update: given the returns of a
//! batch of episodes, each run with policy parameters drawn from a search
//! distribution, it solves the convex REPS dual for the temperature η*,
//! re-weights the samples by `exp((J - max J) / η*)` and refits the
//! distribution by weighted maximum likelihood.
//!
//! - **Dual** (`rl::dual`): the dual objective and derivative, sharing one
//!   max-shifted exponential helper.
//! - **Solver** (`rl::solver`): bounded, gradient-based 1-D minimiser that
//!   reports convergence.
//! - **DualOptimizer / Reps** (`rl::reps`): the update itself and an
//!   episodic agent around it.
//! - **Distributions** (`rl::distribution`): Gaussian search distributions
//!   with weighted MLE.

pub mod config;
pub mod error;
pub mod logging;
pub mod rl;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{ConvergencePolicy, RepsConfig, SolverConfig};
pub use error::{RepsError, Result};
pub use rl::{
    Distribution, DualOptimizer, DualSolution, Episode, FitReport, GaussianDiagonalDistribution,
    GaussianDistribution, Reps,
};
