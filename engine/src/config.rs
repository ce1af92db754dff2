//! Treatment and payment configuration.
//!
//! A [`TreatmentConfig`] is immutable once validated and describes one treatment's
//! parameter catalog and formula variants. [`PaymentConfig`] holds the session-wide
//! payment settings and can be read from `SIGNALS_*` environment variables.
//!
//! # Presets
//!
//! | Preset | Budget rule | π (low/high) | Scoring | Images |
//! |--------|-------------|--------------|---------|--------|
//! | `baseline` | income multiplier | 0.5 / 1.5 | quadratic | combined |
//! | `independent_images` | income multiplier | 0.5 / 1.5 | quadratic | independent |
//! | `roles` | income multiplier + borrower/saver | 0.5 / 1.5 | quadratic | combined |
//! | `exchange` | endowment pair (5,15)/(15,5) | 0.5 / 2 | binarized | combined |
//! | `training` | income multiplier, regime drawn directly | 0.5 / 1.5 | n/a | none |

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::types::{BeliefElicitation, BudgetRule, ImagePairing, PriceRegimes, ScoringRule};

/// What distinguishes rounds besides the income level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSource {
    /// Red-dot stimuli; the regime follows from the red count.
    Stimulus { red_counts: Vec<u32> },
    /// Practice rounds: both regimes are scheduled directly, no stimulus shown.
    PracticeRegimes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreatmentConfig {
    pub label: String,
    pub round_count: usize,
    pub endowment1: f64,
    pub price1: f64,
    pub gross_return: f64,
    pub budget: BudgetRule,
    pub regimes: PriceRegimes,
    pub price_threshold: u32,
    pub stimulus_normalizer: f64,
    pub signal: SignalSource,
    /// Income multipliers, or first-period endowments under [`BudgetRule::EndowmentExchange`].
    pub income_factors: Vec<f64>,
    /// Explicit image identifiers in catalog order.
    pub image_files: Option<Vec<String>>,
    pub image_prefix: String,
    /// One tag per income level for synthesized identifiers.
    pub image_variant_tags: Vec<String>,
    pub pairing: ImagePairing,
    pub elicitation: BeliefElicitation,
    /// Rounds eligible for the final payment draw.
    pub main_rounds: bool,
    /// Balanced borrower/saver role assignment.
    pub roles: bool,
}

impl Default for TreatmentConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl TreatmentConfig {
    /// Choice → signal → belief with income multipliers and the quadratic rule.
    pub fn baseline() -> Self {
        Self {
            label: "baseline".into(),
            round_count: RED_COUNTS.len() * INCOME_FACTORS.len(),
            endowment1: DEFAULT_ENDOWMENT,
            price1: DEFAULT_PRICE,
            gross_return: DEFAULT_GROSS_RETURN,
            budget: BudgetRule::IncomeMultiplier,
            regimes: PriceRegimes {
                low: PI_LOW,
                high: PI_HIGH,
            },
            price_threshold: PRICE_THRESHOLD,
            stimulus_normalizer: STIMULUS_NORMALIZER,
            signal: SignalSource::Stimulus {
                red_counts: RED_COUNTS.to_vec(),
            },
            income_factors: INCOME_FACTORS.to_vec(),
            image_files: None,
            image_prefix: "dots_T0".into(),
            image_variant_tags: IMAGE_VARIANT_TAGS.iter().map(|t| t.to_string()).collect(),
            pairing: ImagePairing::Combined,
            elicitation: BeliefElicitation {
                rule: ScoringRule::Quadratic,
                input_max: BELIEF_INPUT_MAX,
                normalizer: STIMULUS_NORMALIZER,
            },
            main_rounds: true,
            roles: false,
        }
    }

    /// Baseline whose images are shuffled separately from the parameter pairs.
    pub fn independent_images() -> Self {
        Self {
            label: "independent_images".into(),
            image_prefix: "dots_T1".into(),
            pairing: ImagePairing::Independent,
            ..Self::baseline()
        }
    }

    /// Baseline plus a shuffled, balanced borrower/saver role per round.
    pub fn roles() -> Self {
        Self {
            label: "roles".into(),
            image_prefix: "dots_T4".into(),
            roles: true,
            ..Self::baseline()
        }
    }

    /// Endowment pair treatment with the binarized scoring rule.
    pub fn exchange() -> Self {
        Self {
            label: "exchange".into(),
            round_count: RED_COUNTS_SHORT.len() * EXCHANGE_ENDOWMENTS.len(),
            budget: BudgetRule::EndowmentExchange {
                total: EXCHANGE_ENDOWMENT_TOTAL,
            },
            regimes: PriceRegimes {
                low: PI_LOW,
                high: PI_HIGH_EXCHANGE,
            },
            signal: SignalSource::Stimulus {
                red_counts: RED_COUNTS_SHORT.to_vec(),
            },
            income_factors: EXCHANGE_ENDOWMENTS.to_vec(),
            image_prefix: "dots_T3".into(),
            elicitation: BeliefElicitation {
                rule: ScoringRule::BinarizedState,
                input_max: BELIEF_INPUT_MAX,
                normalizer: STIMULUS_NORMALIZER,
            },
            ..Self::baseline()
        }
    }

    /// Four practice rounds covering every (π, x) combination.
    pub fn training() -> Self {
        Self {
            label: "training".into(),
            round_count: 4,
            signal: SignalSource::PracticeRegimes,
            image_prefix: String::new(),
            image_variant_tags: Vec::new(),
            main_rounds: false,
            ..Self::baseline()
        }
    }

    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "independent_images" => Ok(Self::independent_images()),
            "roles" => Ok(Self::roles()),
            "exchange" => Ok(Self::exchange()),
            "training" => Ok(Self::training()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Number of distinct (signal, income) combinations.
    pub fn catalog_size(&self) -> usize {
        let signals = match &self.signal {
            SignalSource::Stimulus { red_counts } => red_counts.len(),
            SignalSource::PracticeRegimes => 2,
        };
        signals * self.income_factors.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("endowment1", self.endowment1)?;
        positive("price1", self.price1)?;
        positive("gross_return", self.gross_return)?;
        positive("regimes.low", self.regimes.low)?;
        positive("regimes.high", self.regimes.high)?;
        positive("stimulus_normalizer", self.stimulus_normalizer)?;
        positive("elicitation.input_max", self.elicitation.input_max)?;
        positive("elicitation.normalizer", self.elicitation.normalizer)?;

        if let BudgetRule::EndowmentExchange { total } = self.budget {
            positive("budget.total", total)?;
            if let Some(&y1) = self.income_factors.iter().find(|&&y1| y1 >= total) {
                return Err(ConfigError::InvalidValue {
                    field: "income_factors",
                    reason: format!("endowment {y1} leaves nothing of the total {total}"),
                });
            }
        }

        if self.income_factors.is_empty() {
            return Err(ConfigError::EmptyCatalog {
                treatment: self.label.clone(),
                what: "income factor",
            });
        }
        for &x in &self.income_factors {
            positive("income_factors", x)?;
        }
        if has_duplicates(&self.income_factors) {
            return Err(ConfigError::DuplicateEntry {
                treatment: self.label.clone(),
                what: "income factor",
            });
        }

        if let SignalSource::Stimulus { red_counts } = &self.signal {
            if red_counts.is_empty() {
                return Err(ConfigError::EmptyCatalog {
                    treatment: self.label.clone(),
                    what: "stimulus",
                });
            }
            let mut sorted = red_counts.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != red_counts.len() {
                return Err(ConfigError::DuplicateEntry {
                    treatment: self.label.clone(),
                    what: "stimulus",
                });
            }
            if self.image_files.is_none() && self.image_variant_tags.len() < self.income_factors.len()
            {
                return Err(ConfigError::InvalidValue {
                    field: "image_variant_tags",
                    reason: format!(
                        "{} tags for {} income levels",
                        self.image_variant_tags.len(),
                        self.income_factors.len()
                    ),
                });
            }
        }

        if self.round_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "round_count",
                reason: "must be at least 1".into(),
            });
        }
        let available = self.catalog_size();
        if self.round_count > available {
            return Err(ConfigError::RoundCountExceedsCatalog {
                round_count: self.round_count,
                available,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a positive finite number, got {value}"),
        })
    }
}

fn has_duplicates(values: &[f64]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, a)| values[i + 1..].iter().any(|b| a == b))
}

/// Session-wide payment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Fixed participation fee added to every payment.
    pub showup_fee: f64,
    /// Money per point.
    pub conversion_rate: f64,
    /// Points paid by a won belief lottery.
    pub belief_prize: f64,
    pub belief_pay_enabled: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            showup_fee: 5.0,
            conversion_rate: 0.05,
            belief_prize: DEFAULT_BELIEF_PRIZE,
            belief_pay_enabled: true,
        }
    }
}

impl PaymentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("showup_fee", self.showup_fee)?;
        non_negative("conversion_rate", self.conversion_rate)?;
        non_negative("belief_prize", self.belief_prize)?;
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a non-negative finite number, got {value}"),
        })
    }
}

/// Everything one experimental session needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Root of every participant's random streams.
    pub session_seed: u64,
    pub payment: PaymentConfig,
    pub treatments: Vec<TreatmentConfig>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            session_seed: 42,
            payment: PaymentConfig::default(),
            treatments: vec![
                TreatmentConfig::training(),
                TreatmentConfig::baseline(),
                TreatmentConfig::exchange(),
                TreatmentConfig::roles(),
            ],
        }
    }
}

impl ExperimentConfig {
    /// Load overrides from environment variables.
    ///
    /// - `SIGNALS_SESSION_SEED` - root seed (u64)
    /// - `SIGNALS_SHOWUP_FEE` - participation fee
    /// - `SIGNALS_CONVERSION_RATE` - money per point
    /// - `SIGNALS_BELIEF_PRIZE` - belief lottery prize in points
    /// - `SIGNALS_BELIEF_PAY_ENABLED` - `true`/`false`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(seed) = env_parse::<u64>("SIGNALS_SESSION_SEED")? {
            config.session_seed = seed;
        }
        if let Some(fee) = env_parse::<f64>("SIGNALS_SHOWUP_FEE")? {
            config.payment.showup_fee = fee;
        }
        if let Some(rate) = env_parse::<f64>("SIGNALS_CONVERSION_RATE")? {
            config.payment.conversion_rate = rate;
        }
        if let Some(prize) = env_parse::<f64>("SIGNALS_BELIEF_PRIZE")? {
            config.payment.belief_prize = prize;
        }
        if let Some(enabled) = env_parse::<bool>("SIGNALS_BELIEF_PAY_ENABLED")? {
            config.payment.belief_pay_enabled = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.payment.validate()?;
        for (i, t) in self.treatments.iter().enumerate() {
            t.validate()?;
            if self.treatments[..i].iter().any(|other| other.label == t.label) {
                return Err(ConfigError::InvalidValue {
                    field: "treatments",
                    reason: format!("duplicate treatment label {}", t.label),
                });
            }
        }
        Ok(())
    }

    pub fn treatment(&self, label: &str) -> Option<&TreatmentConfig> {
        self.treatments.iter().find(|t| t.label == label)
    }
}

fn env_parse<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Env {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
