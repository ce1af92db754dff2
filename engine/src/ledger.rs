//! Append-only record of a participant's completed main rounds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MIN_CONSUMPTION;
use crate::error::ValidationError;
use crate::payoff_model::Budget;
use crate::scoring::{normalize, validate_report};
use crate::types::{ConsumptionOutcome, DecisionRecord, RoundAssignment};

/// Validate `c1` against the round's budget and compute c2 and u.
pub fn evaluate_choice(
    assignment: &RoundAssignment,
    c1: f64,
) -> Result<ConsumptionOutcome, ValidationError> {
    if !c1.is_finite() {
        return Err(ValidationError::NotFinite { field: "c1" });
    }
    if c1 < MIN_CONSUMPTION || c1 > assignment.c1_max {
        return Err(ValidationError::ConsumptionOutOfRange {
            c1,
            c1_max: assignment.c1_max,
        });
    }
    Ok(Budget::from_assignment(assignment).evaluate(assignment.pi, c1))
}

/// Build the record of a main round from the participant's two inputs.
pub fn build_record(
    assignment: &RoundAssignment,
    c1: f64,
    belief_raw: f64,
) -> Result<DecisionRecord, ValidationError> {
    let (stimulus, true_state) = match (
        assignment.main_round,
        assignment.stimulus,
        assignment.true_state,
    ) {
        (true, Some(s), Some(h)) => (s, h),
        _ => return Err(ValidationError::NotMainRound(assignment.treatment.clone())),
    };

    let outcome = evaluate_choice(assignment, c1)?;
    let elicitation = assignment.elicitation;
    validate_report(belief_raw, elicitation.input_max)?;
    let belief = normalize(belief_raw, elicitation.normalizer)?;

    Ok(DecisionRecord {
        treatment: assignment.treatment.clone(),
        round_index: assignment.round_index,
        c1: outcome.c1,
        c2: outcome.c2,
        utility: outcome.utility,
        belief_raw,
        belief,
        true_state,
        stimulus,
        endowment1: assignment.endowment1,
        income_factor: assignment.income_factor,
        regime: assignment.regime,
        pi: assignment.pi,
        role: assignment.role,
        scoring: elicitation.rule,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundLedger {
    records: Vec<DecisionRecord>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&DecisionRecord> {
        self.records.get(index)
    }

    pub fn contains(&self, treatment: &str, round_index: usize) -> bool {
        self.records
            .iter()
            .any(|r| r.treatment == treatment && r.round_index == round_index)
    }

    /// Append a record; each (treatment, round) is accepted once.
    pub fn append(&mut self, record: DecisionRecord) -> Result<&DecisionRecord, ValidationError> {
        if self.contains(&record.treatment, record.round_index) {
            return Err(ValidationError::DuplicateRound {
                treatment: record.treatment,
                round_index: record.round_index,
            });
        }
        debug!(
            treatment = %record.treatment,
            round = record.round_index,
            c1 = record.c1,
            belief = record.belief,
            "round recorded"
        );
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParameterPair, SignalLevel};
    use crate::config::TreatmentConfig;
    use crate::schedule::derive_assignment;
    use crate::types::PriceRegime;

    fn baseline_round(red_count: u32, x: f64) -> RoundAssignment {
        let pair = ParameterPair {
            signal: SignalLevel::RedCount(red_count),
            income_factor: x,
            income_index: 0,
        };
        derive_assignment(&TreatmentConfig::baseline(), 0, &pair, None)
    }

    #[test]
    fn test_record_fields() {
        let a = baseline_round(120, 0.5);
        let r = build_record(&a, 4.0, 140.0).unwrap();
        // c2 = (0.5 * 0.5 * 10 + (10 - 4)) / 0.5 = 17
        assert!((r.c2 - 17.0).abs() < 1e-12);
        assert!((r.utility - 68.0).abs() < 1e-12);
        assert_eq!(r.belief, 0.35);
        assert_eq!(r.true_state, 0.3);
        assert_eq!(r.regime, PriceRegime::Low);
        assert_eq!(r.stimulus, 120);
    }

    #[test]
    fn test_c1_bounds_inclusive() {
        let a = baseline_round(120, 0.5);
        assert!(evaluate_choice(&a, 1.0).is_ok());
        assert!(evaluate_choice(&a, a.c1_max).is_ok());
        assert!(matches!(
            evaluate_choice(&a, 0.99),
            Err(ValidationError::ConsumptionOutOfRange { .. })
        ));
        assert!(matches!(
            evaluate_choice(&a, a.c1_max + 0.01),
            Err(ValidationError::ConsumptionOutOfRange { .. })
        ));
        assert!(evaluate_choice(&a, f64::INFINITY).is_err());
    }

    #[test]
    fn test_belief_out_of_range_not_clamped() {
        let a = baseline_round(120, 0.5);
        assert_eq!(
            build_record(&a, 4.0, 401.0),
            Err(ValidationError::BeliefOutOfRange {
                raw: 401.0,
                max: 400.0
            })
        );
    }

    #[test]
    fn test_practice_round_not_recordable() {
        let config = TreatmentConfig::training();
        let pair = ParameterPair {
            signal: SignalLevel::FixedRegime(PriceRegime::High),
            income_factor: 0.5,
            income_index: 0,
        };
        let a = derive_assignment(&config, 0, &pair, None);
        assert!(evaluate_choice(&a, 2.0).is_ok());
        assert_eq!(
            build_record(&a, 2.0, 100.0),
            Err(ValidationError::NotMainRound("training".into()))
        );
    }

    #[test]
    fn test_ledger_rejects_duplicate_round() {
        let a = baseline_round(185, 1.5);
        let mut ledger = RoundLedger::new();
        ledger.append(build_record(&a, 3.0, 180.0).unwrap()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(matches!(
            ledger.append(build_record(&a, 5.0, 190.0).unwrap()),
            Err(ValidationError::DuplicateRound { .. })
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(0).unwrap().c1, 3.0);
    }
}
