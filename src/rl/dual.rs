// REPS Dual Function
//
// The episodic REPS update re-weights sampled parameters by exp(J / η),
// where the temperature η minimises the convex dual
//
//   g(η) = η·ε + η·log(mean(exp((J - max J) / η))) + max J
//
// Everything that exponentiates returns goes through `ShiftedReturns`, so
// the objective, its derivative and the final weights always share the
// same max-shift.

use crate::error::{RepsError, Result};

/// A batch of episodic returns shifted by their maximum.
///
/// All shifted values satisfy `r[i] <= 0`, so `exp(r[i] / η)` lies in
/// `[0, 1]` for every η > 0 and the maximum sample contributes exactly 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftedReturns {
    max: f64,
    shifted: Vec<f64>,
}

impl ShiftedReturns {
    /// Validate a batch of returns and shift it by its maximum
    pub fn new(returns: &[f64]) -> Result<Self> {
        if returns.is_empty() {
            return Err(RepsError::EmptyBatch);
        }
        if let Some((index, &value)) = returns.iter().enumerate().find(|(_, j)| !j.is_finite()) {
            return Err(RepsError::NonFiniteReturn { index, value });
        }

        let max = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let shifted: Vec<f64> = returns.iter().map(|j| j - max).collect();
        if let Some(index) = shifted.iter().position(|r| !r.is_finite()) {
            return Err(RepsError::NumericOverflow {
                index,
                value: returns[index],
            });
        }

        Ok(Self { max, shifted })
    }

    /// Maximum of the unshifted returns
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns minus their maximum
    pub fn shifted(&self) -> &[f64] {
        &self.shifted
    }

    pub fn len(&self) -> usize {
        self.shifted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifted.is_empty()
    }

    /// `(mean(exp(r/η)), mean(exp(r/η)·r))`
    ///
    /// The first moment is at least `1/N` because the maximum sample has
    /// `r = 0`, so its logarithm is always finite.
    pub fn moments(&self, eta: f64) -> (f64, f64) {
        let n = self.shifted.len() as f64;
        let (sum_w, sum_wr) = self
            .shifted
            .iter()
            .fold((0.0, 0.0), |(sw, swr), &r| {
                let w = (r / eta).exp();
                (sw + w, swr + w * r)
            });
        (sum_w / n, sum_wr / n)
    }

    /// Per-sample weights `exp(r[i] / η)`
    pub fn weights(&self, eta: f64) -> Vec<f64> {
        self.shifted.iter().map(|r| (r / eta).exp()).collect()
    }

    /// KL divergence of the normalised weights `exp(r/η)` from the uniform
    /// distribution over the batch.
    pub fn empirical_kl(&self, eta: f64) -> f64 {
        let (m_w, m_wr) = self.moments(eta);
        m_wr / (eta * m_w) - m_w.ln()
    }
}

/// The REPS dual objective for a fixed KL bound and return batch.
#[derive(Debug, Clone, Copy)]
pub struct DualFunction<'a> {
    eps: f64,
    returns: &'a ShiftedReturns,
}

impl<'a> DualFunction<'a> {
    pub fn new(eps: f64, returns: &'a ShiftedReturns) -> Self {
        Self { eps, returns }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn returns(&self) -> &'a ShiftedReturns {
        self.returns
    }

    /// g(η)
    pub fn value(&self, eta: f64) -> f64 {
        self.value_and_gradient(eta).0
    }

    /// g'(η) = ε + log(mean(w)) - mean(w·r) / (η·mean(w)), with w = exp(r/η)
    ///
    /// Equivalently ε minus the empirical KL at η; the derivative is
    /// non-decreasing in η because g is convex.
    pub fn gradient(&self, eta: f64) -> f64 {
        self.value_and_gradient(eta).1
    }

    /// Objective and derivative from a single pass over the batch
    pub fn value_and_gradient(&self, eta: f64) -> (f64, f64) {
        let (m_w, m_wr) = self.returns.moments(eta);
        let log_m_w = m_w.ln();

        let value = eta * self.eps + eta * log_m_w + self.returns.max();
        let gradient = self.eps + log_m_w - m_wr / (eta * m_w);

        (value, gradient)
    }
}

// =============================================================================
// Tests
// =============================================================================
