//! Shared data model: round assignments, decision records, payoff-table rows and
//! the final payment selection.
//!
//! Every record here is plain data (serde-serializable) so the host can keep it in
//! whatever per-participant key-value store it uses. The tagged variants
//! ([`BudgetRule`], [`ScoringRule`], [`ImagePairing`]) are chosen once per treatment
//! and threaded through the payoff model and the scoring engine explicitly.

use serde::{Deserialize, Serialize};

use crate::constants::ROLE_C1_OFFSET;

/// Realized second-period price level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRegime {
    Low,
    High,
}

impl PriceRegime {
    /// High when the red count exceeds the threshold, low otherwise.
    pub fn from_red_count(red_count: u32, threshold: u32) -> Self {
        if red_count > threshold {
            PriceRegime::High
        } else {
            PriceRegime::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRegime::Low => "low",
            PriceRegime::High => "high",
        }
    }
}

/// Price-regime multipliers π for a treatment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRegimes {
    pub low: f64,
    pub high: f64,
}

impl PriceRegimes {
    pub fn multiplier(&self, regime: PriceRegime) -> f64 {
        match regime {
            PriceRegime::Low => self.low,
            PriceRegime::High => self.high,
        }
    }
}

/// How second-period resources are formed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetRule {
    /// Second-period income π·x·y1; c1_max solved from the binding budget identity.
    IncomeMultiplier,
    /// Fixed endowment pair (y1, total − y1); c1_max = floor(y1 + y2 / 2).
    EndowmentExchange { total: f64 },
}

/// Belief payment rule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    /// Threshold 1 − |b − 1{h > 0.5}|.
    BinarizedState,
    /// Threshold 1 − (b − h)².
    Quadratic,
}

/// Whether stimulus images travel with their parameter pair under the shuffle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePairing {
    /// (pair, image) permuted as one unit.
    Combined,
    /// Pairs and images permuted independently.
    Independent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Borrower,
    Saver,
}

impl Role {
    /// Pre-set first-period consumption shown to a participant in this role.
    pub fn suggested_c1(&self, endowment1: f64) -> f64 {
        match self {
            Role::Borrower => endowment1 - ROLE_C1_OFFSET,
            Role::Saver => endowment1 + ROLE_C1_OFFSET,
        }
    }
}

/// Belief elicitation settings carried by every assignment of a treatment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeliefElicitation {
    pub rule: ScoringRule,
    /// Largest admissible raw report.
    pub input_max: f64,
    /// Divisor turning a raw report into a fraction.
    pub normalizer: f64,
}

/// One element of a participant's schedule, fully derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundAssignment {
    pub treatment: String,
    pub round_index: usize,
    /// Red-dot count; `None` for practice rounds whose regime is set directly.
    pub stimulus: Option<u32>,
    /// Income multiplier x, or the first-period endowment level under exchange.
    pub income_factor: f64,
    pub endowment1: f64,
    pub endowment2: f64,
    pub price1: f64,
    pub gross_return: f64,
    pub budget: BudgetRule,
    pub regimes: PriceRegimes,
    pub regime: PriceRegime,
    /// π of the realized regime.
    pub pi: f64,
    pub price2: f64,
    /// stimulus / normalizer.
    pub true_state: Option<f64>,
    pub image: Option<String>,
    pub role: Option<Role>,
    pub suggested_c1: Option<f64>,
    pub c1_max: f64,
    pub elicitation: BeliefElicitation,
    pub main_round: bool,
}

/// Outcome of one candidate c1 under one price regime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeOutcome {
    pub pi: f64,
    pub c2: f64,
    /// Rounded to two decimals; `None` when infeasible.
    pub utility: Option<f64>,
    pub infeasible: bool,
}

/// One line of the choice-page payoff table. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoffTableRow {
    pub c1: u32,
    pub low: RegimeOutcome,
    pub high: RegimeOutcome,
}

/// c2 and u implied by a first-period choice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionOutcome {
    pub c1: f64,
    pub c2: f64,
    pub utility: f64,
}

/// One completed main round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub treatment: String,
    pub round_index: usize,
    pub c1: f64,
    pub c2: f64,
    pub utility: f64,
    pub belief_raw: f64,
    pub belief: f64,
    pub true_state: f64,
    pub stimulus: u32,
    pub endowment1: f64,
    pub income_factor: f64,
    pub regime: PriceRegime,
    pub pi: f64,
    pub role: Option<Role>,
    pub scoring: ScoringRule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMechanism {
    Consumption,
    Belief,
}

/// Result of one belief-lottery elicitation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeliefOutcome {
    pub rule: ScoringRule,
    pub belief: f64,
    pub true_state: f64,
    pub threshold: f64,
    /// U ~ Uniform[0, 1).
    pub draw: f64,
    pub won: bool,
    pub points: f64,
}

/// End-of-experiment payment; created once per participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalPayoffSelection {
    /// Index into the ledger; `None` when the ledger was empty.
    pub ledger_index: Option<usize>,
    pub treatment: Option<String>,
    pub round_index: Option<usize>,
    pub mechanism: PaymentMechanism,
    pub points: f64,
    pub belief: Option<BeliefOutcome>,
    pub conversion_rate: f64,
    pub showup_fee: f64,
    pub money: f64,
}

/// Per-participant lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Scheduled,
    Recording,
    Finalized,
}
