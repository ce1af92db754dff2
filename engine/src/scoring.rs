//! Belief elicitation: report normalization and the binary-lottery scoring rules.
//!
//! A report b ∈ [0, 1] is scored against the true state h by a win threshold t.
//! One draw U ~ Uniform[0, 1) then pays the prize iff U ≤ t.
//!
//! - Binarized: t = max(0, 1 − |b − 1{h > 0.5}|)
//! - Quadratic: t = max(0, 1 − (b − h)²)

use rand::Rng;

use crate::constants::BINARY_STATE_CUTOFF;
use crate::error::ValidationError;
use crate::types::{BeliefOutcome, ScoringRule};

/// Check that a raw report lies in [0, max].
pub fn validate_report(raw: f64, max: f64) -> Result<(), ValidationError> {
    if !raw.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "belief_raw",
        });
    }
    if !(0.0..=max).contains(&raw) {
        return Err(ValidationError::BeliefOutOfRange { raw, max });
    }
    Ok(())
}

/// raw / normalizer, rejected unless it lands in [0, 1].
pub fn normalize(raw: f64, normalizer: f64) -> Result<f64, ValidationError> {
    if !raw.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "belief_raw",
        });
    }
    let belief = raw / normalizer;
    if !belief.is_finite() || !(0.0..=1.0).contains(&belief) {
        return Err(ValidationError::BeliefNotNormalizable { raw, normalizer });
    }
    Ok(belief)
}

impl ScoringRule {
    /// Probability of winning the prize for report `belief` when the state is `true_state`.
    pub fn threshold(&self, belief: f64, true_state: f64) -> f64 {
        let t = match self {
            ScoringRule::BinarizedState => {
                let state = if true_state > BINARY_STATE_CUTOFF {
                    1.0
                } else {
                    0.0
                };
                1.0 - (belief - state).abs()
            }
            ScoringRule::Quadratic => {
                let d = belief - true_state;
                1.0 - d * d
            }
        };
        t.clamp(0.0, 1.0)
    }
}

/// Score with an externally supplied draw.
pub fn score_with_draw(
    rule: ScoringRule,
    belief: f64,
    true_state: f64,
    prize: f64,
    draw: f64,
) -> BeliefOutcome {
    let threshold = rule.threshold(belief, true_state);
    let won = draw <= threshold;
    BeliefOutcome {
        rule,
        belief,
        true_state,
        threshold,
        draw,
        won,
        points: if won { prize } else { 0.0 },
    }
}

/// Score with exactly one uniform draw from `rng`.
pub fn score<R: Rng>(
    rule: ScoringRule,
    belief: f64,
    true_state: f64,
    prize: f64,
    rng: &mut R,
) -> BeliefOutcome {
    let draw: f64 = rng.random();
    score_with_draw(rule, belief, true_state, prize, draw)
}
