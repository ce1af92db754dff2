//! Error taxonomy.
//!
//! - [`ConfigError`]: malformed treatment catalog; aborts session setup.
//! - [`ValidationError`]: out-of-range participant input; the page layer re-prompts.
//! - [`StateError`]: an operation not allowed in the participant's current phase.

use thiserror::Error;

use crate::types::Phase;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("round count {round_count} exceeds {available} available combinations")]
    RoundCountExceedsCatalog { round_count: usize, available: usize },

    #[error("treatment {treatment} has an empty {what} set")]
    EmptyCatalog { treatment: String, what: &'static str },

    #[error("treatment {treatment} has duplicate {what} entries")]
    DuplicateEntry { treatment: String, what: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid environment variable {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("unknown treatment preset: {0}")]
    UnknownPreset(String),

    #[error("treatment {0} is not configured for this session")]
    UnknownTreatment(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("c1 must be between 1 and {c1_max:.2}, got {c1}")]
    ConsumptionOutOfRange { c1: f64, c1_max: f64 },

    #[error("belief report must be between 0 and {max}, got {raw}")]
    BeliefOutOfRange { raw: f64, max: f64 },

    #[error("belief {raw} / {normalizer} does not lie in [0, 1]")]
    BeliefNotNormalizable { raw: f64, normalizer: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("round index {round_index} is outside the schedule of {len} rounds")]
    RoundOutOfRange { round_index: usize, len: usize },

    #[error("round {round_index} of treatment {treatment} is already recorded")]
    DuplicateRound { treatment: String, round_index: usize },

    #[error("treatment {0} does not produce main rounds")]
    NotMainRound(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("participant {participant} has not started")]
    NotStarted { participant: String },

    #[error("participant {participant} has no schedule for treatment {treatment}")]
    NotScheduled {
        participant: String,
        treatment: String,
    },

    #[error("participant {participant} is already finalized")]
    AlreadyFinalized { participant: String },

    #[error("operation {operation} is not valid in phase {phase:?}")]
    InvalidTransition { operation: &'static str, phase: Phase },
}

/// Unified error type for the experiment core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SignalsError>;
