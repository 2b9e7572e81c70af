// Episodic policy search
//
// Black-box policy search over a parametric distribution of policy
// parameters, with Relative Entropy Policy Search (REPS) as the update rule.

pub mod core;
pub mod distribution;
pub mod dual;
pub mod reps;
pub mod solver;

pub use core::{compute_returns, Episode};
pub use distribution::{Distribution, GaussianDiagonalDistribution, GaussianDistribution};
pub use dual::{DualFunction, ShiftedReturns};
pub use reps::{DualOptimizer, DualSolution, FitReport, Reps};
pub use solver::{BoundedSolver, ScalarObjective, SolverReport, Termination};
