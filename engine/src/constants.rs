//! Experiment constants.
//!
//! Maps the experimental design to concrete values:
//! - stimulus intensity r = number of red dots on a 20×20 grid, so r ∈ [0, 400]
//! - true-state fraction h = r / [`STIMULUS_NORMALIZER`]
//! - price regime π = high when r > [`PRICE_THRESHOLD`], low otherwise
//! - belief reports are entered as a dot count in [0, [`BELIEF_INPUT_MAX`]]

/// Total dots on the stimulus grid; divides the red count into the true-state fraction.
pub const STIMULUS_NORMALIZER: f64 = 400.0;

/// Red counts strictly above this threshold realize the high price regime.
pub const PRICE_THRESHOLD: u32 = 200;

/// Upper bound of the raw belief report (inclusive).
pub const BELIEF_INPUT_MAX: f64 = 400.0;

/// Cutoff used by the binarized scoring rule: h > 0.5 maps to state 1.
pub const BINARY_STATE_CUTOFF: f64 = 0.5;

/// Default first-period endowment y1.
pub const DEFAULT_ENDOWMENT: f64 = 10.0;

/// Default first-period price p1.
pub const DEFAULT_PRICE: f64 = 1.0;

/// Default gross return R = 1 + i with net interest i = 0.
pub const DEFAULT_GROSS_RETURN: f64 = 1.0;

/// Low price-regime multiplier (deflation).
pub const PI_LOW: f64 = 0.5;

/// High price-regime multiplier used by the multiplier treatments.
pub const PI_HIGH: f64 = 1.5;

/// High price-regime multiplier used by the endowment-exchange treatment.
pub const PI_HIGH_EXCHANGE: f64 = 2.0;

/// Smallest admissible consumption in either period.
pub const MIN_CONSUMPTION: f64 = 1.0;

/// Points paid when the belief lottery is won.
pub const DEFAULT_BELIEF_PRIZE: f64 = 100.0;

/// Distance of the role-suggested c1 from the endowment.
pub const ROLE_C1_OFFSET: f64 = 3.0;

/// Red counts of the ten-composition catalogs.
pub const RED_COUNTS: [u32; 10] = [120, 185, 190, 195, 199, 201, 205, 210, 215, 280];

/// Red counts of the six-composition catalog used with endowment pairs.
pub const RED_COUNTS_SHORT: [u32; 6] = [120, 185, 195, 205, 215, 280];

/// Income multipliers x.
pub const INCOME_FACTORS: [f64; 2] = [0.5, 1.5];

/// First-period endowments of the exchange treatment; the partner holds the rest.
pub const EXCHANGE_ENDOWMENTS: [f64; 2] = [5.0, 15.0];

/// y1 + y2 in the exchange treatment.
pub const EXCHANGE_ENDOWMENT_TOTAL: f64 = 20.0;

/// Variant tags appended to synthesized image identifiers, one per income level.
pub const IMAGE_VARIANT_TAGS: [&str; 2] = ["a", "b"];

/// Round `x` to two decimals for display.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
