// Episodic Relative Entropy Policy Search
//
// "A Survey on Policy Search for Robotics", Deisenroth, Neumann, Peters (2013).
//
// Each update re-weights the sampled parameter vectors by exp(J / η*), where
// η* minimises the REPS dual under a KL bound ε, and refits the search
// distribution by weighted maximum likelihood.

use crate::config::{ConvergencePolicy, RepsConfig, SolverConfig};
use crate::error::{RepsError, Result};
use crate::rl::core::{compute_returns, Episode};
use crate::rl::distribution::Distribution;
use crate::rl::dual::{DualFunction, ShiftedReturns};
use crate::rl::solver::{BoundedSolver, SolverReport};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of solving the dual for one batch of returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualSolution {
    /// Optimal temperature η*
    pub eta: f64,

    /// Per-sample weights exp((J - max J) / η*), in batch order
    pub weights: Vec<f64>,

    /// Dual objective at η*
    pub dual_value: f64,

    /// Dual derivative at η*
    pub gradient: f64,

    /// KL of the normalised weights from uniform; equals ε at an interior
    /// optimum and is below ε when η* sits on the lower bound
    pub empirical_kl: f64,

    pub solver: SolverReport,
}

/// Solves the REPS dual and feeds the resulting weights to a distribution.
///
/// Immutable after construction; a single optimizer can serve any number
/// of independent batches.
#[derive(Debug, Clone)]
pub struct DualOptimizer {
    eps: f64,
    solver: BoundedSolver,
    on_nonconvergence: ConvergencePolicy,
}

impl DualOptimizer {
    /// Create an optimizer with KL bound `eps` and default solver settings
    pub fn new(eps: f64) -> Result<Self> {
        Self::from_config(&RepsConfig::new(eps))
    }

    pub fn from_config(cfg: &RepsConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            eps: cfg.eps,
            solver: BoundedSolver::new(cfg.solver.clone()),
            on_nonconvergence: cfg.on_nonconvergence,
        })
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn solver_config(&self) -> &SolverConfig {
        self.solver.config()
    }

    /// Solve for η* and the sample weights without touching a distribution
    pub fn solve(&self, returns: &[f64]) -> Result<DualSolution> {
        let shifted = ShiftedReturns::new(returns)?;
        let dual = DualFunction::new(self.eps, &shifted);
        let report = self.solver.minimize(&dual);

        if !report.converged {
            match self.on_nonconvergence {
                ConvergencePolicy::Strict => {
                    return Err(RepsError::SolverNonConvergence {
                        iterations: report.iterations,
                        eta: report.eta,
                        gradient: report.gradient,
                    });
                }
                ConvergencePolicy::BestEffort => {
                    warn!(
                        eta = report.eta,
                        gradient = report.gradient,
                        iterations = report.iterations,
                        "dual solver did not converge; using last iterate"
                    );
                }
            }
        }

        let eta = report.eta;
        Ok(DualSolution {
            eta,
            weights: shifted.weights(eta),
            dual_value: report.value,
            gradient: report.gradient,
            empirical_kl: shifted.empirical_kl(eta),
            solver: report,
        })
    }

    /// Solve the dual for `returns` and refit `distribution` on `theta`
    /// weighted by the result.
    ///
    /// `theta[i]` is the parameter vector that produced `returns[i]`. On any
    /// error the distribution is left untouched.
    pub fn update<D: Distribution>(
        &self,
        returns: &[f64],
        theta: &[Vec<f64>],
        distribution: &mut D,
    ) -> Result<DualSolution> {
        if theta.len() != returns.len() {
            return Err(RepsError::LengthMismatch {
                returns: returns.len(),
                features: theta.len(),
            });
        }

        let solution = self.solve(returns)?;
        distribution.mle(theta, &solution.weights)?;
        Ok(solution)
    }
}

/// Summary of one REPS fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub n_episodes: usize,

    /// Mean discounted return of the batch
    pub mean_return: f64,

    /// Best discounted return of the batch
    pub max_return: f64,

    pub eta: f64,

    pub empirical_kl: f64,

    pub solver_iterations: usize,

    /// Distribution mean after the refit
    pub distribution_mean: Vec<f64>,
}

/// Episodic REPS agent over a parametric search distribution.
#[derive(Debug, Clone)]
pub struct Reps<D: Distribution> {
    distribution: D,
    optimizer: DualOptimizer,
    gamma: f64,
}

impl<D: Distribution> Reps<D> {
    pub fn new(distribution: D, cfg: &RepsConfig) -> Result<Self> {
        let optimizer = DualOptimizer::from_config(cfg)?;
        Ok(Self {
            distribution,
            optimizer,
            gamma: cfg.gamma,
        })
    }

    pub fn distribution(&self) -> &D {
        &self.distribution
    }

    pub fn optimizer(&self) -> &DualOptimizer {
        &self.optimizer
    }

    pub fn into_distribution(self) -> D {
        self.distribution
    }

    /// Draw the policy parameters for a new episode
    pub fn episode_start(&self, rng: &mut impl Rng) -> Vec<f64> {
        self.distribution.sample(rng)
    }

    /// Update the search distribution from a batch of finished episodes
    pub fn fit(&mut self, episodes: &[Episode]) -> Result<FitReport> {
        if episodes.is_empty() {
            return Err(RepsError::EmptyBatch);
        }

        let returns = compute_returns(episodes, self.gamma);
        let theta: Vec<Vec<f64>> = episodes.iter().map(|ep| ep.theta.clone()).collect();

        let solution = self
            .optimizer
            .update(&returns, &theta, &mut self.distribution)?;

        let report = FitReport {
            n_episodes: episodes.len(),
            mean_return: returns.iter().sum::<f64>() / returns.len() as f64,
            max_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            eta: solution.eta,
            empirical_kl: solution.empirical_kl,
            solver_iterations: solution.solver.iterations,
            distribution_mean: self.distribution.mean().to_vec(),
        };

        info!(
            distribution = self.distribution.name(),
            n_episodes = report.n_episodes,
            mean_return = report.mean_return,
            eta = report.eta,
            kl = report.empirical_kl,
            "REPS fit"
        );

        Ok(report)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::distribution::{GaussianDiagonalDistribution, GaussianDistribution};
    use crate::rl::solver::Termination;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_invalid_eps_rejected() {
        for eps in [0.0, -0.1, f64::NAN] {
            assert!(matches!(
                DualOptimizer::new(eps),
                Err(RepsError::InvalidBound(_))
            ));
        }
    }

    #[test]
    fn test_worked_example() {
        let opt = DualOptimizer::new(1.0).unwrap();
        let sol = opt.solve(&[1.0, 2.0, 3.0]).unwrap();

        assert!(sol.solver.converged);
        assert!(sol.gradient.abs() < 1e-8);
        assert_eq!(sol.weights[2], 1.0);
        assert!(sol.weights[0] < sol.weights[1]);
        assert!(sol.weights[1] < sol.weights[2]);
        assert!((sol.empirical_kl - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_empty_batch() {
        let opt = DualOptimizer::new(0.5).unwrap();
        assert!(matches!(opt.solve(&[]), Err(RepsError::EmptyBatch)));
    }

    #[test]
    fn test_equal_returns_unit_weights() {
        let opt = DualOptimizer::new(0.5).unwrap();
        let sol = opt.solve(&[-3.0; 5]).unwrap();

        assert_eq!(sol.solver.termination, Termination::LowerBound);
        assert!(sol.weights.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_strict_policy_surfaces_nonconvergence() {
        let cfg = RepsConfig {
            solver: SolverConfig {
                max_iter: 1,
                ..SolverConfig::default()
            },
            ..RepsConfig::new(1.0)
        };
        let opt = DualOptimizer::from_config(&cfg).unwrap();
        let mut dist = GaussianDistribution::new(vec![0.0], vec![1.0]).unwrap();

        let err = opt
            .update(&[1.0, 2.0, 3.0], &[vec![1.0], vec![2.0], vec![3.0]], &mut dist)
            .unwrap_err();
        assert!(matches!(err, RepsError::SolverNonConvergence { iterations: 1, .. }));
        assert_eq!(dist.mean(), &[0.0]);
    }

    #[test]
    fn test_best_effort_policy_accepts_last_iterate() {
        let cfg = RepsConfig {
            solver: SolverConfig {
                max_iter: 1,
                ..SolverConfig::default()
            },
            on_nonconvergence: ConvergencePolicy::BestEffort,
            ..RepsConfig::new(1.0)
        };
        let opt = DualOptimizer::from_config(&cfg).unwrap();
        let sol = opt.solve(&[1.0, 2.0, 3.0]).unwrap();

        assert!(!sol.solver.converged);
        assert_eq!(sol.eta, 1.0);
        assert_eq!(sol.weights[2], 1.0);
    }

    #[test]
    fn test_update_length_mismatch() {
        let opt = DualOptimizer::new(0.5).unwrap();
        let mut dist = GaussianDistribution::new(vec![0.0], vec![1.0]).unwrap();
        let err = opt.update(&[1.0, 2.0], &[vec![1.0]], &mut dist).unwrap_err();
        assert!(matches!(err, RepsError::LengthMismatch { returns: 2, features: 1 }));
    }

    #[test]
    fn test_update_moves_mean_toward_best_sample() {
        let opt = DualOptimizer::new(0.5).unwrap();
        let mut dist = GaussianDistribution::new(vec![0.0], vec![1.0]).unwrap();
        let theta = vec![vec![-1.0], vec![0.0], vec![1.0]];

        opt.update(&[-1.0, 0.0, 1.0], &theta, &mut dist).unwrap();
        assert!(dist.mean()[0] > 0.0);
        assert!(dist.mean()[0] < 1.0);
    }

    #[test]
    fn test_agent_improves_quadratic() {
        let target = [1.5, -0.5];
        let dist = GaussianDiagonalDistribution::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let mut agent = Reps::new(dist, &RepsConfig::new(0.5)).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        let score = |theta: &[f64]| -> f64 {
            -theta
                .iter()
                .zip(target)
                .map(|(x, t)| (x - t).powi(2))
                .sum::<f64>()
        };

        let initial = score(agent.distribution().mean());
        for _ in 0..30 {
            let episodes: Vec<Episode> = (0..25)
                .map(|_| {
                    let theta = agent.episode_start(&mut rng);
                    let reward = score(&theta);
                    Episode::with_rewards(theta, vec![reward])
                })
                .collect();
            let report = agent.fit(&episodes).unwrap();
            assert!(report.empirical_kl <= 0.5 + 1e-6);
        }

        let last = score(agent.distribution().mean());
        assert!(last > initial);
        assert!(last > -0.25);
    }

    #[test]
    fn test_agent_rejects_empty_fit() {
        let dist = GaussianDistribution::new(vec![0.0], vec![1.0]).unwrap();
        let mut agent = Reps::new(dist, &RepsConfig::default()).unwrap();
        assert!(matches!(agent.fit(&[]), Err(RepsError::EmptyBatch)));
    }
}
