// Search Distributions for Black-Box Policy Search
//
// Episodic policy search samples a full policy parameter vector θ per
// episode from a parametric search distribution, then refits that
// distribution by weighted maximum likelihood once the episodes are scored.

use crate::error::{RepsError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{E, PI};

/// Parametric distribution over policy parameters.
///
/// `mle` must leave the distribution unchanged when it returns an error.
pub trait Distribution {
    /// Dimensionality of θ
    fn dim(&self) -> usize;

    /// Current mean of the distribution
    fn mean(&self) -> &[f64];

    /// Draw one parameter vector
    fn sample(&self, rng: &mut impl Rng) -> Vec<f64>;

    /// Log density at θ
    fn log_pdf(&self, theta: &[f64]) -> f64;

    /// Differential entropy
    fn entropy(&self) -> f64;

    /// Weighted maximum-likelihood refit from per-sample parameters and
    /// non-negative weights of the same length
    fn mle(&mut self, theta: &[Vec<f64>], weights: &[f64]) -> Result<()>;

    /// Get a human-readable name for the distribution
    fn name(&self) -> &str {
        "Distribution"
    }
}

/// Standard normal draw via Box-Muller
fn standard_normal(rng: &mut impl Rng) -> f64 {
    // 1 - U keeps the argument of ln in (0, 1]
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Checks shared by every weighted refit; returns Σw.
fn check_weighted_batch(dim: usize, theta: &[Vec<f64>], weights: &[f64]) -> Result<f64> {
    if theta.len() != weights.len() {
        return Err(RepsError::LengthMismatch {
            returns: weights.len(),
            features: theta.len(),
        });
    }
    if theta.is_empty() {
        return Err(RepsError::EmptyBatch);
    }
    if let Some(bad) = theta.iter().find(|t| t.len() != dim) {
        return Err(RepsError::DimensionMismatch {
            expected: dim,
            found: bad.len(),
        });
    }
    if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
        return Err(RepsError::InvalidWeights(format!(
            "weights must be finite and >= 0, found {w}"
        )));
    }

    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(RepsError::InvalidWeights(
            "weights sum to zero".to_string(),
        ));
    }
    Ok(sum)
}

fn weighted_mean(dim: usize, theta: &[Vec<f64>], weights: &[f64], sum_w: f64) -> Vec<f64> {
    let mut mu = vec![0.0; dim];
    for (t, &w) in theta.iter().zip(weights) {
        for (m, x) in mu.iter_mut().zip(t) {
            *m += w * x;
        }
    }
    mu.iter_mut().for_each(|m| *m /= sum_w);
    mu
}

fn diagonal_log_pdf(mu: &[f64], std: &[f64], theta: &[f64]) -> f64 {
    mu.iter()
        .zip(std)
        .zip(theta)
        .map(|((m, s), x)| {
            let z = (x - m) / s;
            -0.5 * z * z - s.ln() - 0.5 * (2.0 * PI).ln()
        })
        .sum()
}

fn diagonal_entropy(std: &[f64]) -> f64 {
    std.iter()
        .map(|s| 0.5 * (2.0 * PI * E).ln() + s.ln())
        .sum()
}

fn check_std(std: &[f64]) -> Result<()> {
    if std.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(RepsError::InvalidConfig(
            "standard deviations must be finite and > 0".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Gaussian with fixed spread
// =============================================================================

/// Diagonal Gaussian whose standard deviations stay fixed; only the mean is
/// refit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianDistribution {
    mu: Vec<f64>,
    std: Vec<f64>,
}

impl GaussianDistribution {
    pub fn new(mu: Vec<f64>, std: Vec<f64>) -> Result<Self> {
        if mu.len() != std.len() {
            return Err(RepsError::DimensionMismatch {
                expected: mu.len(),
                found: std.len(),
            });
        }
        check_std(&std)?;
        Ok(Self { mu, std })
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }
}

impl Distribution for GaussianDistribution {
    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn mean(&self) -> &[f64] {
        &self.mu
    }

    fn sample(&self, rng: &mut impl Rng) -> Vec<f64> {
        self.mu
            .iter()
            .zip(&self.std)
            .map(|(m, s)| m + s * standard_normal(rng))
            .collect()
    }

    fn log_pdf(&self, theta: &[f64]) -> f64 {
        diagonal_log_pdf(&self.mu, &self.std, theta)
    }

    fn entropy(&self) -> f64 {
        diagonal_entropy(&self.std)
    }

    fn mle(&mut self, theta: &[Vec<f64>], weights: &[f64]) -> Result<()> {
        let sum_w = check_weighted_batch(self.dim(), theta, weights)?;
        self.mu = weighted_mean(self.dim(), theta, weights, sum_w);
        Ok(())
    }

    fn name(&self) -> &str {
        "GaussianDistribution"
    }
}

// =============================================================================
// Gaussian with learned diagonal spread
// =============================================================================

/// Diagonal Gaussian whose mean and per-dimension standard deviation are
/// both refit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianDiagonalDistribution {
    mu: Vec<f64>,
    std: Vec<f64>,
}

impl GaussianDiagonalDistribution {
    pub fn new(mu: Vec<f64>, std: Vec<f64>) -> Result<Self> {
        if mu.len() != std.len() {
            return Err(RepsError::DimensionMismatch {
                expected: mu.len(),
                found: std.len(),
            });
        }
        check_std(&std)?;
        Ok(Self { mu, std })
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }
}

impl Distribution for GaussianDiagonalDistribution {
    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn mean(&self) -> &[f64] {
        &self.mu
    }

    fn sample(&self, rng: &mut impl Rng) -> Vec<f64> {
        self.mu
            .iter()
            .zip(&self.std)
            .map(|(m, s)| m + s * standard_normal(rng))
            .collect()
    }

    fn log_pdf(&self, theta: &[f64]) -> f64 {
        diagonal_log_pdf(&self.mu, &self.std, theta)
    }

    fn entropy(&self) -> f64 {
        diagonal_entropy(&self.std)
    }

    /// Weighted MLE with the unbiased weighted-variance normaliser
    /// `Z = Σw - Σw² / Σw`.
    fn mle(&mut self, theta: &[Vec<f64>], weights: &[f64]) -> Result<()> {
        let dim = self.dim();
        let sum_w = check_weighted_batch(dim, theta, weights)?;
        let sum_w2: f64 = weights.iter().map(|w| w * w).sum();
        let z = sum_w - sum_w2 / sum_w;
        if z <= f64::EPSILON * sum_w {
            return Err(RepsError::DegenerateWeights(format!(
                "variance normaliser {z:e} from {} samples",
                weights.len()
            )));
        }

        let mu = weighted_mean(dim, theta, weights, sum_w);

        let mut var = vec![0.0; dim];
        for (t, &w) in theta.iter().zip(weights) {
            for ((v, x), m) in var.iter_mut().zip(t).zip(&mu) {
                *v += w * (x - m).powi(2);
            }
        }
        let std: Vec<f64> = var.iter().map(|v| (v / z).sqrt()).collect();
        if std.iter().any(|s| !(*s > 0.0)) {
            return Err(RepsError::DegenerateWeights(
                "weighted samples have zero spread".to_string(),
            ));
        }

        self.mu = mu;
        self.std = std;
        Ok(())
    }

    fn name(&self) -> &str {
        "GaussianDiagonalDistribution"
    }
}

// =============================================================================
// Tests
// =============================================================================
