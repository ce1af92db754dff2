//! Final payment: one main round drawn uniformly, then the payment mechanism.
//!
//! Draw order on the participant's final-payment stream:
//! 1. ledger index, uniform over all recorded rounds
//! 2. mechanism, a fair coin (skipped when belief payment is disabled)
//! 3. belief lottery U, only when the belief mechanism was drawn
//!
//! Money = points × conversion rate + show-up fee. Idempotence is enforced by the
//! participant state machine, not here.

use rand::Rng;
use tracing::info;

use crate::config::PaymentConfig;
use crate::ledger::RoundLedger;
use crate::scoring;
use crate::types::{FinalPayoffSelection, PaymentMechanism};

pub fn select_and_pay<R: Rng>(
    ledger: &RoundLedger,
    payment: &PaymentConfig,
    rng: &mut R,
) -> FinalPayoffSelection {
    if ledger.is_empty() {
        info!(fee = payment.showup_fee, "empty ledger, paying show-up fee only");
        return FinalPayoffSelection {
            ledger_index: None,
            treatment: None,
            round_index: None,
            mechanism: PaymentMechanism::Consumption,
            points: 0.0,
            belief: None,
            conversion_rate: payment.conversion_rate,
            showup_fee: payment.showup_fee,
            money: payment.showup_fee,
        };
    }

    let index = rng.random_range(0..ledger.len());
    let chosen = &ledger.records()[index];

    let mechanism = if payment.belief_pay_enabled && rng.random_bool(0.5) {
        PaymentMechanism::Belief
    } else {
        PaymentMechanism::Consumption
    };

    let (points, belief) = match mechanism {
        PaymentMechanism::Consumption => (chosen.utility, None),
        PaymentMechanism::Belief => {
            let outcome = scoring::score(
                chosen.scoring,
                chosen.belief,
                chosen.true_state,
                payment.belief_prize,
                rng,
            );
            (outcome.points, Some(outcome))
        }
    };

    let money = points * payment.conversion_rate + payment.showup_fee;
    info!(
        index,
        treatment = %chosen.treatment,
        round = chosen.round_index,
        mechanism = ?mechanism,
        points,
        money,
        "final payoff selected"
    );

    FinalPayoffSelection {
        ledger_index: Some(index),
        treatment: Some(chosen.treatment.clone()),
        round_index: Some(chosen.round_index),
        mechanism,
        points,
        belief,
        conversion_rate: payment.conversion_rate,
        showup_fee: payment.showup_fee,
        money,
    }
}
