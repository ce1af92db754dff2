//! Two-period consumption-savings payoffs.
//!
//! With first-period endowment y1, price p1, gross return R, regime multiplier π and
//! second-period price p2 = π·p1, a first-period choice c1 leaves savings
//! s = y1 − p1·c1 and yields
//!
//! | Budget rule | c2 | c1_max |
//! |-------------|----|--------|
//! | income multiplier x | (π·x·y1 + R·s) / p2 | (π·x·y1 + R·y1 − p2) / (R·p1) |
//! | endowment pair (y1, y2) | y2 + R·s / p2 | floor(y1 + y2 / 2) |
//!
//! Utility is u = c1·c2. A choice is infeasible whenever c2 < 1. Under the
//! multiplier rule c1_max is exactly the binding point c2 = 1.

use crate::constants::{round2, MIN_CONSUMPTION};
use crate::types::{
    BudgetRule, ConsumptionOutcome, PayoffTableRow, PriceRegime, PriceRegimes, RegimeOutcome,
    RoundAssignment,
};

/// Budget parameters of one round, independent of the realized regime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Budget {
    pub rule: BudgetRule,
    pub endowment1: f64,
    /// Partner endowment y2; only read by [`BudgetRule::EndowmentExchange`].
    pub endowment2: f64,
    pub income_factor: f64,
    pub price1: f64,
    pub gross_return: f64,
}

impl Budget {
    pub fn from_assignment(a: &RoundAssignment) -> Self {
        Self {
            rule: a.budget,
            endowment1: a.endowment1,
            endowment2: a.endowment2,
            income_factor: a.income_factor,
            price1: a.price1,
            gross_return: a.gross_return,
        }
    }

    /// Largest admissible c1 under regime multiplier `pi`.
    pub fn max_feasible_c1(&self, pi: f64) -> f64 {
        match self.rule {
            BudgetRule::IncomeMultiplier => c1_max_multiplier(
                pi,
                self.income_factor,
                self.endowment1,
                self.price1,
                self.gross_return,
            ),
            BudgetRule::EndowmentExchange { .. } => {
                c1_max_exchange(self.endowment1, self.endowment2)
            }
        }
    }

    pub fn second_period_consumption(&self, pi: f64, c1: f64) -> f64 {
        let price2 = pi * self.price1;
        match self.rule {
            BudgetRule::IncomeMultiplier => c2_multiplier(
                pi,
                self.income_factor,
                self.endowment1,
                self.price1,
                price2,
                c1,
                self.gross_return,
            ),
            BudgetRule::EndowmentExchange { .. } => c2_exchange(
                self.endowment1,
                self.endowment2,
                self.price1,
                price2,
                c1,
                self.gross_return,
            ),
        }
    }

    /// c2 and u at full precision.
    pub fn evaluate(&self, pi: f64, c1: f64) -> ConsumptionOutcome {
        let c2 = self.second_period_consumption(pi, c1);
        ConsumptionOutcome {
            c1,
            c2,
            utility: utility(c1, c2),
        }
    }
}

/// c1_max = (π·x·y1 + R·y1 − p2) / (R·p1) with p2 = π·p1.
pub fn c1_max_multiplier(pi: f64, x: f64, y1: f64, p1: f64, r: f64) -> f64 {
    let p2 = pi * p1;
    (pi * x * y1 + r * y1 - p2) / (r * p1)
}

/// c1_max = floor(y1 + y2 / 2).
pub fn c1_max_exchange(y1: f64, y2: f64) -> f64 {
    (y1 + y2 / 2.0).floor()
}

/// c2 = (π·x·y1 + R·(y1 − p1·c1)) / p2.
pub fn c2_multiplier(pi: f64, x: f64, y1: f64, p1: f64, p2: f64, c1: f64, r: f64) -> f64 {
    let s = y1 - p1 * c1;
    (pi * x * y1 + r * s) / p2
}

/// c2 = y2 + R·(y1 − p1·c1) / p2.
pub fn c2_exchange(y1: f64, y2: f64, p1: f64, p2: f64, c1: f64, r: f64) -> f64 {
    let s = y1 - p1 * c1;
    y2 + (r * s) / p2
}

#[inline]
pub fn utility(c1: f64, c2: f64) -> f64 {
    c1 * c2
}

fn regime_outcome(budget: &Budget, pi: f64, c1: f64) -> RegimeOutcome {
    let c2 = budget.second_period_consumption(pi, c1);
    let infeasible = c2 < MIN_CONSUMPTION;
    RegimeOutcome {
        pi,
        c2,
        utility: if infeasible {
            None
        } else {
            Some(round2(utility(c1, c2)))
        },
        infeasible,
    }
}

/// One row per integer c1 in 1..=floor(c1_max), each evaluated under both regimes.
pub fn build_payoff_table(
    budget: &Budget,
    regimes: PriceRegimes,
    c1_max: f64,
) -> Vec<PayoffTableRow> {
    if !c1_max.is_finite() || c1_max < 1.0 {
        return Vec::new();
    }
    let top = c1_max.floor() as u32;
    (1..=top)
        .map(|k| {
            let c1 = f64::from(k);
            PayoffTableRow {
                c1: k,
                low: regime_outcome(budget, regimes.multiplier(PriceRegime::Low), c1),
                high: regime_outcome(budget, regimes.multiplier(PriceRegime::High), c1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multiplier_budget(x: f64) -> Budget {
        Budget {
            rule: BudgetRule::IncomeMultiplier,
            endowment1: 10.0,
            endowment2: 5.0,
            income_factor: x,
            price1: 1.0,
            gross_return: 1.0,
        }
    }

    fn exchange_budget(y1: f64) -> Budget {
        Budget {
            rule: BudgetRule::EndowmentExchange { total: 20.0 },
            endowment1: y1,
            endowment2: 20.0 - y1,
            income_factor: y1,
            price1: 1.0,
            gross_return: 1.0,
        }
    }

    #[test]
    fn test_reference_choice() {
        let b = multiplier_budget(1.0);
        assert!((b.max_feasible_c1(0.5) - 14.5).abs() < 1e-12);
        let out = b.evaluate(0.5, 5.0);
        assert!((out.c2 - 20.0).abs() < 1e-12);
        assert!((out.utility - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_c1_max_is_binding_point() {
        let b = multiplier_budget(0.5);
        for pi in [0.5, 1.5, 2.0] {
            let c1_max = b.max_feasible_c1(pi);
            let c2 = b.second_period_consumption(pi, c1_max);
            assert!((c2 - 1.0).abs() < 1e-9, "pi={pi} c2={c2}");
        }
    }

    #[test]
    fn test_exchange_formulas() {
        let b = exchange_budget(5.0);
        assert_eq!(b.max_feasible_c1(2.0), 12.0);
        // c2 = 15 + (5 - 3) / 2
        assert!((b.second_period_consumption(2.0, 3.0) - 16.0).abs() < 1e-12);
        assert_eq!(exchange_budget(15.0).max_feasible_c1(0.5), 17.0);
    }

    #[test]
    fn test_table_spans_both_regimes() {
        let b = multiplier_budget(0.5);
        let regimes = PriceRegimes {
            low: 0.5,
            high: 1.5,
        };
        let c1_max = b.max_feasible_c1(1.5);
        let rows = build_payoff_table(&b, regimes, c1_max);
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0].c1, 1);
        assert_eq!(rows[0].low.pi, 0.5);
        assert_eq!(rows[0].high.pi, 1.5);
        // c1 = 1, π = 0.5: c2 = (2.5 + 9) / 0.5 = 23
        assert_eq!(rows[0].low.utility, Some(23.0));
    }

    #[test]
    fn test_infeasible_rows_have_no_utility() {
        let b = multiplier_budget(0.5);
        let regimes = PriceRegimes {
            low: 0.5,
            high: 1.5,
        };
        // the high-regime c1_max overruns the low-regime budget
        let rows = build_payoff_table(&b, regimes, b.max_feasible_c1(1.5));
        let last = rows.last().unwrap();
        assert_eq!(last.c1, 16);
        assert!(last.low.infeasible);
        assert_eq!(last.low.utility, None);
        assert!(!last.high.infeasible);
        assert_eq!(last.high.utility, Some(16.0));
        for row in &rows {
            assert_eq!(row.low.infeasible, row.low.c2 < 1.0);
            assert_eq!(row.high.infeasible, row.high.c2 < 1.0);
        }
    }

    #[test]
    fn test_utility_rounded_for_display() {
        let b = Budget {
            price1: 3.0,
            ..multiplier_budget(0.5)
        };
        let rows = build_payoff_table(&b, PriceRegimes { low: 0.5, high: 1.5 }, 2.0);
        // c1 = 1, π = 1.5: c2 = (7.5 + 7) / 4.5 = 3.2222...
        assert_eq!(rows[0].high.utility, Some(3.22));
    }

    #[test]
    fn test_empty_table_below_one() {
        let b = multiplier_budget(0.5);
        let regimes = PriceRegimes {
            low: 0.5,
            high: 1.5,
        };
        assert!(build_payoff_table(&b, regimes, 0.9).is_empty());
        assert!(build_payoff_table(&b, regimes, f64::NAN).is_empty());
    }
}
