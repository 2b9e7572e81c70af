//! Error types for the policy-search crate.

/// Errors raised while validating inputs, solving the REPS dual, or
/// refitting a search distribution.
#[derive(Debug, thiserror::Error)]
pub enum RepsError {
    #[error("invalid KL bound: epsilon must be finite and > 0, got {0}")]
    InvalidBound(f64),

    #[error("empty return batch: at least one episode is required")]
    EmptyBatch,

    #[error("non-finite return at index {index}: {value}")]
    NonFiniteReturn { index: usize, value: f64 },

    #[error("return {value} at index {index} lies too far below the batch maximum to shift without overflow")]
    NumericOverflow { index: usize, value: f64 },

    #[error("length mismatch: {returns} returns but {features} parameter samples")]
    LengthMismatch { returns: usize, features: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("degenerate weights: effective sample size too small to refit ({0})")]
    DegenerateWeights(String),

    #[error(
        "dual solver did not converge after {iterations} iterations \
         (eta = {eta}, gradient = {gradient})"
    )]
    SolverNonConvergence {
        iterations: usize,
        eta: f64,
        gradient: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RepsError>;
