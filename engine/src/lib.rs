//! # Signals: computational core of a multi-treatment savings experiment
//!
//! Each participant sees a shuffled sequence of red-dot stimuli paired with income
//! levels, chooses first-period consumption under a two-period budget, reports a
//! belief about the dot count, and is finally paid for one randomly drawn round.
//!
//! ## Data flow
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | catalog | [`catalog`] | Cross product of stimuli × income levels, one image per pair |
//! | schedule | [`schedule`] | Per-participant unbiased permutation, memoized per treatment |
//! | choice | [`payoff_model`] | c1_max, c2, u and the two-regime payoff table |
//! | belief | [`scoring`] | Report normalization and the binary-lottery scoring rules |
//! | record | [`ledger`] | Append-only main-round records |
//! | payment | [`selection`] | Uniform round draw, mechanism coin, money conversion |
//!
//! [`session::ParticipantState`] ties the stages together as a state machine
//! (uninitialized → scheduled → recording → finalized) and
//! [`session::Experiment`] exposes it to a host through a [`store::ParticipantStore`].
//!
//! ## Randomness
//!
//! Every random decision draws from a [`rand::rngs::SmallRng`] seeded from the
//! session seed, the participant id and a stream label ([`seeding`]), so a
//! participant's schedule and payment are reproducible and never redrawn.
//!
//! ## Formula variants
//!
//! Treatments select one [`types::BudgetRule`] (income multiplier vs endowment
//! pair) and one [`types::ScoringRule`] (binarized vs quadratic). The choice is
//! made once in [`config::TreatmentConfig`] and carried in every
//! [`types::RoundAssignment`] and [`types::DecisionRecord`].

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod payoff_model;
pub mod schedule;
pub mod scoring;
pub mod seeding;
pub mod selection;
pub mod session;
pub mod store;
pub mod types;

pub use config::{ExperimentConfig, PaymentConfig, TreatmentConfig};
pub use error::{ConfigError, Result, SignalsError, StateError, ValidationError};
pub use session::{Experiment, ParticipantState};
pub use store::{InMemoryStore, ParticipantStore};
