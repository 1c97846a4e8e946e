// ===============================
// src/predictor.rs (fair-value predictors)
// ===============================
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Price;
use crate::history::{Feature, HistoryCache};

/// Acceptable trading range for one tick.
///
/// `lower` is the highest price worth buying at, `upper` the lowest price
/// worth selling at. `Unbounded` means the predictor has no opinion yet:
/// price-taking is disabled, book-only quoting still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FairValueBand {
    Unbounded,
    Bounded { lower: Price, upper: Price },
}

impl FairValueBand {
    pub fn around(center: Price, half_width: Price) -> Self {
        FairValueBand::Bounded { lower: center - half_width, upper: center + half_width }
    }

    pub fn lower(&self) -> Option<Price> {
        match self { FairValueBand::Bounded { lower, .. } => Some(*lower), FairValueBand::Unbounded => None }
    }

    pub fn upper(&self) -> Option<Price> {
        match self { FairValueBand::Bounded { upper, .. } => Some(*upper), FairValueBand::Unbounded => None }
    }

    pub fn is_bounded(&self) -> bool { matches!(self, FairValueBand::Bounded { .. }) }
}

fn default_half_width() -> Price { 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorConfig {
    /// Fair value known structurally (e.g. redeemable at a fixed price).
    Constant { fair_value: Price },
    /// Pre-fitted linear model over the last `window` values of each feature.
    /// `coefficients` holds `window` entries per feature, in feature order,
    /// each block ordered oldest to newest.
    Regression {
        window: usize,
        features: Vec<Feature>,
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_half_width")]
        half_width: Price,
    },
}

impl PredictorConfig {
    pub fn validate(&self, symbol: &str) -> Result<(), ConfigError> {
        match self {
            PredictorConfig::Constant { .. } => Ok(()),
            PredictorConfig::Regression { window, features, coefficients, half_width, .. } => {
                if *window == 0 || features.is_empty() {
                    return Err(ConfigError::Invalid(format!("{symbol}: regression needs window > 0 and at least one feature")));
                }
                if coefficients.len() != window * features.len() {
                    return Err(ConfigError::Invalid(format!(
                        "{symbol}: expected {} coefficients, got {}",
                        window * features.len(),
                        coefficients.len()
                    )));
                }
                if *half_width < 0 {
                    return Err(ConfigError::Invalid(format!("{symbol}: negative half_width")));
                }
                Ok(())
            }
        }
    }

    /// Features this predictor reads, with the window each needs.
    pub fn tracked(&self) -> Vec<(Feature, usize)> {
        match self {
            PredictorConfig::Constant { .. } => Vec::new(),
            PredictorConfig::Regression { window, features, .. } => {
                features.iter().map(|f| (f.clone(), *window)).collect()
            }
        }
    }

    /// Point prediction in whole ticks. None while any feature history is
    /// short, or while the feature windows do not cover the same ticks.
    pub fn predict(&self, cache: &HistoryCache) -> Option<Price> {
        match self {
            PredictorConfig::Constant { fair_value } => Some(*fair_value),
            PredictorConfig::Regression { window, features, coefficients, intercept, .. } => {
                let mut acc = *intercept;
                let mut ticks: Option<Vec<u64>> = None;
                for (i, f) in features.iter().enumerate() {
                    let h = cache.get(f)?;
                    let stamps: Vec<u64> = h.last_n_ticks(*window)?.collect();
                    // koefisien per posisi waktu: semua window harus dari tick yang sama
                    if *ticks.get_or_insert_with(|| stamps.clone()) != stamps {
                        return None;
                    }
                    let values = h.last_n(*window)?;
                    let coefs = &coefficients[i * window..(i + 1) * window];
                    acc += values.zip(coefs).map(|(v, c)| v * c).sum::<f64>();
                }
                // ties-to-even, sama dengan round() bawaan model yang di-fit
                Some(acc.round_ties_even() as Price)
            }
        }
    }

    pub fn band(&self, cache: &HistoryCache) -> FairValueBand {
        match (self, self.predict(cache)) {
            (PredictorConfig::Constant { fair_value }, _) => FairValueBand::around(*fair_value, 0),
            (PredictorConfig::Regression { half_width, .. }, Some(p)) => FairValueBand::around(p, *half_width),
            (PredictorConfig::Regression { .. }, None) => FairValueBand::Unbounded,
        }
    }
}
