use thiserror::Error;

/// Structural errors raised by the routing engine.
///
/// These signal a broken internal invariant or malformed caller input. A
/// missing route or missing liquidity is not an error and never shows up here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("weights and routes differ in length: {weights} weights, {routes} routes")]
    WeightRouteMismatch { weights: usize, routes: usize },

    #[error("route {index} has no steps")]
    EmptyRoute { index: usize },

    #[error("route {route} step {step} is malformed: {reason}")]
    MalformedStep {
        route: usize,
        step: usize,
        reason: String,
    },

    #[error("no pair for pool {pool_id} (reversed: {reversed})")]
    UnknownPair { pool_id: String, reversed: bool },

    #[error("invalid fee {numerator}/{denominator}")]
    InvalidFee { numerator: u32, denominator: u32 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported token {0}")]
    UnsupportedToken(String),
}
