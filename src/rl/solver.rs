// Bounded 1-D Dual Solver
//
// Minimises a convex scalar function on [lower, +inf) using only its
// derivative. Because the derivative of a convex function is monotone, the
// minimiser is either the lower bound (derivative already >= 0 there) or the
// root of the derivative. The solver brackets that root geometrically from
// the starting point, with a step factor that doubles on every move so the
// search covers any scale of returns in a few dozen evaluations, and then
// refines it with Illinois false position, falling back to bisection
// whenever the secant step leaves the bracket.

use crate::config::SolverConfig;
use crate::rl::dual::DualFunction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// |g'(η)| fell below `grad_tol`
    GradientTolerance,
    /// The bracket around the root shrank below `x_tol` (relative)
    BracketTolerance,
    /// g'(lower) >= 0, so the constrained minimum sits on the bound
    LowerBound,
    /// Ran out of gradient evaluations
    MaxIterations,
    /// The objective or its derivative evaluated to NaN or infinity
    NonFiniteObjective,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        !matches!(
            self,
            Termination::MaxIterations | Termination::NonFiniteObjective
        )
    }
}

/// Outcome of one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    /// Final iterate
    pub eta: f64,

    /// g(η) at the final iterate
    pub value: f64,

    /// g'(η) at the final iterate
    pub gradient: f64,

    /// Gradient evaluations spent (bracketing + refinement)
    pub iterations: usize,

    pub termination: Termination,

    pub converged: bool,
}

/// Anything the bounded solver can minimise: a scalar objective with its
/// derivative, evaluated together.
pub trait ScalarObjective {
    fn value_and_gradient(&self, x: f64) -> (f64, f64);
}

impl ScalarObjective for DualFunction<'_> {
    fn value_and_gradient(&self, x: f64) -> (f64, f64) {
        DualFunction::value_and_gradient(self, x)
    }
}

/// Gradient-based minimiser for convex scalar functions with a lower bound.
#[derive(Debug, Clone, Default)]
pub struct BoundedSolver {
    cfg: SolverConfig,
}

/// Counts evaluations against the iteration budget.
struct Budget<'a, F: ScalarObjective + ?Sized> {
    f: &'a F,
    used: usize,
    max: usize,
}

impl<F: ScalarObjective + ?Sized> Budget<'_, F> {
    fn exhausted(&self) -> bool {
        self.used >= self.max
    }

    fn eval(&mut self, x: f64) -> (f64, f64) {
        self.used += 1;
        self.f.value_and_gradient(x)
    }
}

impl BoundedSolver {
    pub fn new(cfg: SolverConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.cfg
    }

    /// Minimise `f` over `[min_eta, +inf)` starting from `eta_init`.
    pub fn minimize<F: ScalarObjective + ?Sized>(&self, f: &F) -> SolverReport {
        let lower = self.cfg.min_eta;
        let mut budget = Budget {
            f,
            used: 0,
            max: self.cfg.max_iter,
        };

        let x0 = self.cfg.eta_init.max(lower);
        let (v0, g0) = budget.eval(x0);
        if !(v0.is_finite() && g0.is_finite()) {
            return self.finish(x0, v0, g0, budget.used, Termination::NonFiniteObjective);
        }
        if g0.abs() <= self.cfg.grad_tol {
            return self.finish(x0, v0, g0, budget.used, Termination::GradientTolerance);
        }

        // Bracket the root of g' as (a, ga < 0) and (b, gb > 0).
        let (mut a, mut ga, mut b, mut gb);
        let (mut va, mut vb);
        let mut step = 2.0;
        if g0 < 0.0 {
            (a, va, ga) = (x0, v0, g0);
            let mut x = x0;
            loop {
                if budget.exhausted() {
                    return self.finish(a, va, ga, budget.used, Termination::MaxIterations);
                }
                x *= step;
                step *= 2.0;
                let (v, g) = budget.eval(x);
                if !(v.is_finite() && g.is_finite()) {
                    return self.finish(x, v, g, budget.used, Termination::NonFiniteObjective);
                }
                if g.abs() <= self.cfg.grad_tol {
                    return self.finish(x, v, g, budget.used, Termination::GradientTolerance);
                }
                if g > 0.0 {
                    (b, vb, gb) = (x, v, g);
                    break;
                }
                (a, va, ga) = (x, v, g);
            }
        } else {
            (b, vb, gb) = (x0, v0, g0);
            let mut x = x0;
            loop {
                if x <= lower {
                    return self.finish(x, vb, gb, budget.used, Termination::LowerBound);
                }
                if budget.exhausted() {
                    return self.finish(b, vb, gb, budget.used, Termination::MaxIterations);
                }
                x = (x / step).max(lower);
                step *= 2.0;
                let (v, g) = budget.eval(x);
                if !(v.is_finite() && g.is_finite()) {
                    return self.finish(x, v, g, budget.used, Termination::NonFiniteObjective);
                }
                if g.abs() <= self.cfg.grad_tol {
                    return self.finish(x, v, g, budget.used, Termination::GradientTolerance);
                }
                if g < 0.0 {
                    (a, va, ga) = (x, v, g);
                    break;
                }
                (b, vb, gb) = (x, v, g);
            }
        }

        // Illinois false position on the bracket [a, b].
        let mut side = 0i8;
        let (mut fa, mut fb) = (ga, gb);
        loop {
            if b - a <= self.cfg.x_tol * b {
                let (x, v, g) = if ga.abs() <= gb.abs() {
                    (a, va, ga)
                } else {
                    (b, vb, gb)
                };
                return self.finish(x, v, g, budget.used, Termination::BracketTolerance);
            }
            if budget.exhausted() {
                let (x, v, g) = if ga.abs() <= gb.abs() {
                    (a, va, ga)
                } else {
                    (b, vb, gb)
                };
                return self.finish(x, v, g, budget.used, Termination::MaxIterations);
            }

            let mut c = (a * fb - b * fa) / (fb - fa);
            if !(c > a && c < b) {
                c = 0.5 * (a + b);
            }
            let (vc, gc) = budget.eval(c);
            if !(vc.is_finite() && gc.is_finite()) {
                return self.finish(c, vc, gc, budget.used, Termination::NonFiniteObjective);
            }
            if gc.abs() <= self.cfg.grad_tol {
                return self.finish(c, vc, gc, budget.used, Termination::GradientTolerance);
            }

            if gc < 0.0 {
                (a, va, ga, fa) = (c, vc, gc, gc);
                if side == -1 {
                    fb *= 0.5;
                }
                side = -1;
            } else {
                (b, vb, gb, fb) = (c, vc, gc, gc);
                if side == 1 {
                    fa *= 0.5;
                }
                side = 1;
            }
        }
    }

    fn finish(
        &self,
        eta: f64,
        value: f64,
        gradient: f64,
        iterations: usize,
        termination: Termination,
    ) -> SolverReport {
        debug!(
            eta,
            value,
            gradient,
            iterations,
            ?termination,
            "dual solver finished"
        );
        SolverReport {
            eta,
            value,
            gradient,
            iterations,
            termination,
            converged: termination.is_converged(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
