//! Parameter catalog: the cross product of signals and income levels, each with
//! its stimulus image identifier.
//!
//! Catalog order is signal-major: (r₀, x₀), (r₀, x₁), (r₁, x₀), ... Images are
//! attached in the same order, so an explicit image list must follow it too.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{SignalSource, TreatmentConfig};
use crate::types::PriceRegime;

/// What a round shows the participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignalLevel {
    RedCount(u32),
    FixedRegime(PriceRegime),
}

/// One (signal, income) combination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterPair {
    pub signal: SignalLevel,
    pub income_factor: f64,
    /// Position of the income level in the treatment's list; selects the image tag.
    pub income_index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterCatalog {
    pub pairs: Vec<ParameterPair>,
    /// Parallel to `pairs`; empty when the treatment shows no images.
    pub images: Vec<String>,
}

impl ParameterCatalog {
    pub fn from_config(config: &TreatmentConfig) -> Self {
        let signals: Vec<SignalLevel> = match &config.signal {
            SignalSource::Stimulus { red_counts } => {
                red_counts.iter().map(|&r| SignalLevel::RedCount(r)).collect()
            }
            SignalSource::PracticeRegimes => vec![
                SignalLevel::FixedRegime(PriceRegime::Low),
                SignalLevel::FixedRegime(PriceRegime::High),
            ],
        };

        let mut pairs = Vec::with_capacity(signals.len() * config.income_factors.len());
        for &signal in &signals {
            for (income_index, &income_factor) in config.income_factors.iter().enumerate() {
                pairs.push(ParameterPair {
                    signal,
                    income_factor,
                    income_index,
                });
            }
        }

        let images = match config.signal {
            SignalSource::Stimulus { .. } => resolve_images(config, &pairs),
            SignalSource::PracticeRegimes => Vec::new(),
        };

        Self { pairs, images }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Use the explicit list when its length matches the catalog, else synthesize.
fn resolve_images(config: &TreatmentConfig, pairs: &[ParameterPair]) -> Vec<String> {
    match &config.image_files {
        Some(files) if files.len() == pairs.len() => files.clone(),
        Some(files) => {
            warn!(
                treatment = %config.label,
                provided = files.len(),
                expected = pairs.len(),
                "image list length mismatch, synthesizing file names"
            );
            synthesize_image_names(config, pairs)
        }
        None => synthesize_image_names(config, pairs),
    }
}

/// `<prefix>_<red count>_<variant tag>.png`, one per pair.
pub fn synthesize_image_names(config: &TreatmentConfig, pairs: &[ParameterPair]) -> Vec<String> {
    pairs
        .iter()
        .filter_map(|p| match p.signal {
            SignalLevel::RedCount(r) => {
                let tag = config
                    .image_variant_tags
                    .get(p.income_index)
                    .map(String::as_str)
                    .unwrap_or("x");
                Some(image_name(&config.image_prefix, r, tag))
            }
            SignalLevel::FixedRegime(_) => None,
        })
        .collect()
}

fn image_name(prefix: &str, red_count: u32, tag: &str) -> String {
    if prefix.is_empty() {
        format!("{red_count}_{tag}.png")
    } else {
        format!("{prefix}_{red_count}_{tag}.png")
    }
}
