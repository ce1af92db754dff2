//! Per-participant round schedules.
//!
//! A schedule is an unbiased permutation of the treatment's parameter catalog,
//! truncated to the configured round count and fully derived into
//! [`RoundAssignment`]s. It is built once per (participant, treatment) and then only
//! read by index; the participant state in [`crate::session`] owns the memoization.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ParameterCatalog, ParameterPair, SignalLevel};
use crate::config::TreatmentConfig;
use crate::error::{ConfigError, ValidationError};
use crate::payoff_model::Budget;
use crate::seeding::{stream_rng, Stream};
use crate::types::{BudgetRule, ImagePairing, PriceRegime, Role, RoundAssignment};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub treatment: String,
    pub rounds: Vec<RoundAssignment>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn get(&self, round_index: usize) -> Result<&RoundAssignment, ValidationError> {
        self.rounds
            .get(round_index)
            .ok_or(ValidationError::RoundOutOfRange {
                round_index,
                len: self.rounds.len(),
            })
    }
}

/// Build the schedule of one participant from its seed.
///
/// The permutation and the role order draw from separate streams, so enabling
/// roles does not change which parameters a participant sees.
pub fn build_participant_schedule(
    config: &TreatmentConfig,
    participant_seed: u64,
) -> Result<Schedule, ConfigError> {
    let mut rng = stream_rng(participant_seed, Stream::Schedule, &config.label);
    let mut schedule = build_schedule(config, &mut rng)?;
    if config.roles {
        let mut role_rng = stream_rng(participant_seed, Stream::Roles, &config.label);
        assign_roles(&mut schedule, &mut role_rng);
    }
    Ok(schedule)
}

/// Permute the catalog with `rng` and derive the first `round_count` rounds.
pub fn build_schedule<R: Rng>(
    config: &TreatmentConfig,
    rng: &mut R,
) -> Result<Schedule, ConfigError> {
    config.validate()?;
    let catalog = ParameterCatalog::from_config(config);
    if config.round_count > catalog.len() {
        return Err(ConfigError::RoundCountExceedsCatalog {
            round_count: config.round_count,
            available: catalog.len(),
        });
    }

    let permuted: Vec<(ParameterPair, Option<String>)> = if catalog.images.is_empty() {
        let mut pairs = catalog.pairs;
        pairs.shuffle(rng);
        pairs.into_iter().map(|p| (p, None)).collect()
    } else {
        match config.pairing {
            ImagePairing::Combined => {
                let mut combined: Vec<(ParameterPair, Option<String>)> = catalog
                    .pairs
                    .into_iter()
                    .zip(catalog.images.into_iter().map(Some))
                    .collect();
                combined.shuffle(rng);
                combined
            }
            ImagePairing::Independent => {
                let mut pairs = catalog.pairs;
                let mut images = catalog.images;
                pairs.shuffle(rng);
                images.shuffle(rng);
                pairs.into_iter().zip(images.into_iter().map(Some)).collect()
            }
        }
    };

    let rounds: Vec<RoundAssignment> = permuted
        .into_iter()
        .take(config.round_count)
        .enumerate()
        .map(|(i, (pair, image))| derive_assignment(config, i, &pair, image))
        .collect();

    debug!(
        treatment = %config.label,
        rounds = rounds.len(),
        pairing = ?config.pairing,
        "schedule built"
    );

    Ok(Schedule {
        treatment: config.label.clone(),
        rounds,
    })
}

/// Half borrowers, half savers (the odd one out saves), in shuffled order.
fn assign_roles<R: Rng>(schedule: &mut Schedule, rng: &mut R) {
    let n = schedule.rounds.len();
    let mut roles: Vec<Role> = (0..n)
        .map(|i| if i < n / 2 { Role::Borrower } else { Role::Saver })
        .collect();
    roles.shuffle(rng);
    for (round, role) in schedule.rounds.iter_mut().zip(roles) {
        round.role = Some(role);
        round.suggested_c1 = Some(role.suggested_c1(round.endowment1));
    }
}

/// Turn one catalog entry into the parameters of round `round_index`.
pub fn derive_assignment(
    config: &TreatmentConfig,
    round_index: usize,
    pair: &ParameterPair,
    image: Option<String>,
) -> RoundAssignment {
    let (stimulus, regime) = match pair.signal {
        SignalLevel::RedCount(r) => (
            Some(r),
            PriceRegime::from_red_count(r, config.price_threshold),
        ),
        SignalLevel::FixedRegime(regime) => (None, regime),
    };
    let pi = config.regimes.multiplier(regime);
    let x = pair.income_factor;

    let (endowment1, endowment2) = match config.budget {
        // second-period income under the realized regime
        BudgetRule::IncomeMultiplier => (config.endowment1, pi * x * config.endowment1),
        BudgetRule::EndowmentExchange { total } => (x, total - x),
    };

    let budget = Budget {
        rule: config.budget,
        endowment1,
        endowment2,
        income_factor: x,
        price1: config.price1,
        gross_return: config.gross_return,
    };

    RoundAssignment {
        treatment: config.label.clone(),
        round_index,
        stimulus,
        income_factor: x,
        endowment1,
        endowment2,
        price1: config.price1,
        gross_return: config.gross_return,
        budget: config.budget,
        regimes: config.regimes,
        regime,
        pi,
        price2: pi * config.price1,
        true_state: stimulus.map(|r| f64::from(r) / config.stimulus_normalizer),
        image,
        role: None,
        suggested_c1: None,
        c1_max: budget.max_feasible_c1(pi),
        elicitation: config.elicitation,
        main_round: config.main_rounds,
    }
}
