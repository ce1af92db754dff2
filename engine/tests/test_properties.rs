//! Property-based tests for schedules, the budget model, scoring rules and payment.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use signals::catalog::{ParameterCatalog, SignalLevel};
use signals::config::{PaymentConfig, TreatmentConfig};
use signals::payoff_model::{build_payoff_table, Budget};
use signals::schedule::{build_participant_schedule, build_schedule};
use signals::scoring::normalize;
use signals::types::{BudgetRule, PriceRegime, PriceRegimes, RoundAssignment, ScoringRule};
use signals::ParticipantState;

const PRESETS: [&str; 5] = [
    "baseline",
    "independent_images",
    "roles",
    "exchange",
    "training",
];

fn preset_strategy() -> impl Strategy<Value = TreatmentConfig> {
    (0..PRESETS.len()).prop_map(|i| TreatmentConfig::preset(PRESETS[i]).unwrap())
}

fn round_key(a: &RoundAssignment) -> (Option<u32>, u64, PriceRegime) {
    (a.stimulus, a.income_factor.to_bits(), a.regime)
}

fn multiplier_budget(x: f64, y1: f64, p1: f64, r: f64) -> Budget {
    Budget {
        rule: BudgetRule::IncomeMultiplier,
        endowment1: y1,
        endowment2: 0.0,
        income_factor: x,
        price1: p1,
        gross_return: r,
    }
}

proptest! {
    // 1. A schedule has round_count distinct rounds drawn from the catalog
    #[test]
    fn schedule_is_distinct_subset_of_catalog(config in preset_strategy(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let schedule = build_schedule(&config, &mut rng).unwrap();
        prop_assert_eq!(schedule.len(), config.round_count);

        let catalog: HashSet<(Option<u32>, u64, PriceRegime)> = ParameterCatalog::from_config(&config)
            .pairs
            .iter()
            .map(|p| match p.signal {
                SignalLevel::RedCount(r) => (
                    Some(r),
                    p.income_factor.to_bits(),
                    PriceRegime::from_red_count(r, config.price_threshold),
                ),
                SignalLevel::FixedRegime(regime) => (None, p.income_factor.to_bits(), regime),
            })
            .collect();

        let mut seen = HashSet::new();
        for (i, round) in schedule.rounds.iter().enumerate() {
            prop_assert_eq!(round.round_index, i);
            prop_assert!(catalog.contains(&round_key(round)));
            prop_assert!(seen.insert(round_key(round)), "duplicate round {:?}", round_key(round));
        }
    }

    // 2. Schedules are a pure function of the participant seed
    #[test]
    fn schedule_reproducible(config in preset_strategy(), seed in any::<u64>()) {
        let a = build_participant_schedule(&config, seed).unwrap();
        let b = build_participant_schedule(&config, seed).unwrap();
        prop_assert_eq!(a, b);
    }

    // 3. Roles are balanced within one schedule
    #[test]
    fn roles_balanced(seed in any::<u64>()) {
        let schedule = build_participant_schedule(&TreatmentConfig::roles(), seed).unwrap();
        let borrowers = schedule
            .rounds
            .iter()
            .filter(|r| r.role == Some(signals::types::Role::Borrower))
            .count();
        prop_assert_eq!(borrowers, schedule.len() / 2);
        prop_assert!(schedule.rounds.iter().all(|r| r.suggested_c1.is_some()));
    }

    // 4. c1_max is the largest c1 that keeps c2 ≥ 1
    #[test]
    fn c1_max_matches_exhaustive_search(
        pi in prop_oneof![Just(0.5f64), Just(1.5f64), Just(2.0f64)],
        x in 0.25f64..2.0,
        y1 in 1.0f64..50.0,
        p1 in 0.5f64..3.0,
        r in 0.5f64..2.0,
    ) {
        let budget = multiplier_budget(x, y1, p1, r);
        let c1_max = budget.max_feasible_c1(pi);
        for k in 1..=200u32 {
            let c1 = f64::from(k);
            if (c1 - c1_max).abs() < 1e-6 {
                continue;
            }
            let feasible = budget.second_period_consumption(pi, c1) >= 1.0;
            prop_assert_eq!(feasible, c1 < c1_max, "k={} c1_max={}", k, c1_max);
        }
    }

    // 5. Table rows: one per integer c1, infeasible iff c2 < 1, u = c1·c2 to display precision
    #[test]
    fn payoff_table_consistent(
        x in 0.25f64..2.0,
        y1 in 1.0f64..30.0,
        high in prop_oneof![Just(1.5f64), Just(2.0f64)],
    ) {
        let budget = multiplier_budget(x, y1, 1.0, 1.0);
        let regimes = PriceRegimes { low: 0.5, high };
        let c1_max = budget.max_feasible_c1(high);
        let rows = build_payoff_table(&budget, regimes, c1_max);
        let expected = if c1_max >= 1.0 { c1_max.floor() as usize } else { 0 };
        prop_assert_eq!(rows.len(), expected);

        for row in &rows {
            let c1 = f64::from(row.c1);
            for outcome in [&row.low, &row.high] {
                prop_assert_eq!(outcome.infeasible, outcome.c2 < 1.0);
                match outcome.utility {
                    None => prop_assert!(outcome.infeasible),
                    Some(u) => prop_assert!((u - c1 * outcome.c2).abs() <= 0.005 + 1e-9),
                }
            }
        }
    }

    // 6. Quadratic threshold lies in [0, 1], peaks at the truth and falls with distance
    #[test]
    fn quadratic_threshold_monotone(h in 0.0f64..=1.0, b1 in 0.0f64..=1.0, b2 in 0.0f64..=1.0) {
        let rule = ScoringRule::Quadratic;
        let t1 = rule.threshold(b1, h);
        let t2 = rule.threshold(b2, h);
        prop_assert!((0.0..=1.0).contains(&t1));
        prop_assert_eq!(rule.threshold(h, h), 1.0);
        if (b1 - h).abs() <= (b2 - h).abs() {
            prop_assert!(t1 >= t2);
        }
    }

    // 7. Binarized threshold lies in [0, 1] and a point belief on the state's side wins surely
    #[test]
    fn binarized_threshold_bounds(h in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let rule = ScoringRule::BinarizedState;
        let t = rule.threshold(b, h);
        prop_assert!((0.0..=1.0).contains(&t));
        let side = if h > 0.5 { 1.0 } else { 0.0 };
        prop_assert_eq!(rule.threshold(side, h), 1.0);
        prop_assert!(rule.threshold(side, h) >= t);
    }

    // 8. Under the quadratic rule the mean belief maximizes the expected win probability
    #[test]
    fn quadratic_rule_proper(
        dist in prop::collection::vec((0.0f64..=1.0, 0.01f64..1.0), 1..6),
        report in 0.0f64..=1.0,
    ) {
        let total: f64 = dist.iter().map(|(_, w)| w).sum();
        let mean: f64 = dist.iter().map(|(h, w)| h * w).sum::<f64>() / total;
        let expected = |b: f64| -> f64 {
            dist.iter()
                .map(|(h, w)| w * ScoringRule::Quadratic.threshold(b, *h))
                .sum::<f64>()
                / total
        };
        prop_assert!(expected(mean) >= expected(report) - 1e-12);
    }

    // 9. Every report in [0, normalizer] normalizes into [0, 1], anything above is rejected
    #[test]
    fn normalize_range(raw in 0.0f64..=400.0, excess in 0.001f64..100.0) {
        let b = normalize(raw, 400.0).unwrap();
        prop_assert!((0.0..=1.0).contains(&b));
        prop_assert!(normalize(400.0 + excess, 400.0).is_err());
    }

    // 10. Finalizing is idempotent and replayable from the seed alone
    #[test]
    fn finalize_idempotent(session_seed in any::<u64>(), rounds in 0usize..8) {
        let payment = PaymentConfig::default();
        let config = TreatmentConfig::baseline();

        let play = || {
            let mut state = ParticipantState::new("P1", session_seed);
            state.initialize_schedule(&config).unwrap();
            for i in 0..rounds {
                let a = state.round_assignment("baseline", i).unwrap().clone();
                let belief = f64::from(a.stimulus.unwrap());
                state.record_round("baseline", i, 1.0, belief).unwrap();
            }
            state
        };

        let mut state = play();
        let first = serde_json::to_string(state.finalize(&payment).unwrap()).unwrap();
        let second = serde_json::to_string(state.finalize(&payment).unwrap()).unwrap();
        prop_assert_eq!(&first, &second);

        let mut replay = play();
        let third = serde_json::to_string(replay.finalize(&payment).unwrap()).unwrap();
        prop_assert_eq!(&first, &third);
    }
}
