// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : tick_trader_rust — per-tick order-generation engine in Rust
Module  : <module_name>.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Turns per-tick order books and inventory into limit orders:
          constant and regression fair-value bands, market-making with
          inventory skew, basket-vs-synthetic arbitrage with hysteresis,
          hard position-limit checks, Prometheus metrics, JSONL records.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbitrage::{BasketConfig, Component};
use crate::domain::{Qty, Symbol};
use crate::history::Feature;
use crate::predictor::PredictorConfig;
use crate::strategy::{MarketMakeParams, QuoteStyle, SkewTiers};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("parse {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },
}

/// Satu instrumen: limit wajib, predictor & gaya quoting opsional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub limit: Qty,
    #[serde(default)]
    pub predictor: Option<PredictorConfig>,
    #[serde(default)]
    pub quoting: Option<QuoteStyle>,
}

impl InstrumentConfig {
    pub fn validate(&self, symbol: &str) -> Result<(), ConfigError> {
        if self.limit <= 0 {
            return Err(ConfigError::Invalid(format!("{symbol}: limit must be positive")));
        }
        if let Some(p) = &self.predictor {
            p.validate(symbol)?;
        }
        if let Some(q) = &self.quoting {
            q.validate(symbol)?;
            if matches!(q, QuoteStyle::DeviationTaker { .. }) && self.predictor.is_none() {
                return Err(ConfigError::Invalid(format!("{symbol}: deviation taker needs a predictor")));
            }
        }
        Ok(())
    }
}

fn default_conversions() -> i64 { 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub instruments: BTreeMap<Symbol, InstrumentConfig>,
    #[serde(default)]
    pub baskets: Vec<BasketConfig>,
    #[serde(default = "default_conversions")]
    pub conversions: i64,
}

impl EngineConfig {
    pub fn limit(&self, symbol: &str) -> Option<Qty> {
        self.instruments.get(symbol).map(|i| i.limit)
    }

    /// Every feature any predictor reads, with the largest window asked for.
    pub fn tracked_features(&self) -> BTreeMap<Feature, usize> {
        let mut out: BTreeMap<Feature, usize> = BTreeMap::new();
        for inst in self.instruments.values() {
            let Some(p) = &inst.predictor else { continue };
            for (f, w) in p.tracked() {
                let e = out.entry(f).or_insert(0);
                *e = (*e).max(w);
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (sym, inst) in &self.instruments {
            inst.validate(sym)?;
        }

        let mut seen = BTreeSet::new();
        for b in &self.baskets {
            b.validate()?;
            if !seen.insert(b.basket.as_str()) {
                return Err(ConfigError::Invalid(format!("{}: basket configured twice", b.basket)));
            }
            let Some(inst) = self.instruments.get(&b.basket) else {
                return Err(ConfigError::Invalid(format!("{}: basket has no instrument entry (limit)", b.basket)));
            };
            // satu instrumen, satu engine
            if inst.quoting.is_some() {
                return Err(ConfigError::Invalid(format!("{}: basket leg also has quoting configured", b.basket)));
            }
        }
        Ok(())
    }

    /// Built-in preset mirroring the reference strategy's instrument set.
    pub fn reference() -> Self {
        let mut instruments = BTreeMap::new();

        // tight-spread, fair value struktural
        instruments.insert(
            "AMETHYSTS".to_string(),
            InstrumentConfig {
                limit: 20,
                predictor: Some(PredictorConfig::Constant { fair_value: 10_000 }),
                quoting: Some(QuoteStyle::MarketMake(MarketMakeParams {
                    take_offset: 1,
                    unwind_concession: true,
                    quote_offset: 1,
                    passive_chunk: Some(40),
                    skew: Some(SkewTiers::default()),
                })),
            },
        );

        instruments.insert(
            "STARFRUIT".to_string(),
            InstrumentConfig {
                limit: 20,
                predictor: Some(PredictorConfig::Regression {
                    window: 4,
                    features: vec![Feature::Mid("STARFRUIT".into())],
                    coefficients: vec![-0.01869561, 0.0455032, 0.16316049, 0.8090892],
                    intercept: 4.481696494462085,
                    half_width: 1,
                }),
                quoting: Some(QuoteStyle::MarketMake(MarketMakeParams::default())),
            },
        );

        instruments.insert(
            "ORCHIDS".to_string(),
            InstrumentConfig {
                limit: 100,
                predictor: Some(PredictorConfig::Regression {
                    window: 4,
                    features: vec![
                        Feature::Mid("ORCHIDS".into()),
                        Feature::Observation("ORCHIDS.sunlight".into()),
                        Feature::Observation("ORCHIDS.humidity".into()),
                    ],
                    coefficients: vec![
                        1.0032660592215041, -0.01661690483455555, 0.01774100307629441, -0.004772261712975734,
                        -0.0067775624498480624, 0.013449829049283046, -0.010207885081724655, 0.00354740873126147,
                        0.4123593854358205, -1.0009058984766757, 0.7969951917929698, -0.2067842202425254,
                    ],
                    intercept: 0.25173645853783455,
                    half_width: 1,
                }),
                quoting: Some(QuoteStyle::MarketMake(MarketMakeParams::default())),
            },
        );

        for (sym, limit) in [("CHOCOLATE", 250), ("STRAWBERRIES", 350), ("ROSES", 60), ("GIFT_BASKET", 60)] {
            instruments.insert(sym.to_string(), InstrumentConfig { limit, predictor: None, quoting: None });
        }

        instruments.insert(
            "COCONUT".to_string(),
            InstrumentConfig {
                limit: 300,
                predictor: Some(PredictorConfig::Regression {
                    window: 4,
                    features: vec![Feature::Mid("COCONUT".into()), Feature::Mid("COCONUT_COUPON".into())],
                    coefficients: vec![
                        0.9624814518494764, 0.04900246016600207, -0.00656214095442198, -0.005184200768296066,
                        0.012032813103374451, -0.0233345197230852, 0.012672593695095213, -0.0009207580536969573,
                    ],
                    intercept: 2.3347427181706735,
                    half_width: 4,
                }),
                quoting: Some(QuoteStyle::DeviationTaker { edge: 1.0 }),
            },
        );
        instruments.insert("COCONUT_COUPON".to_string(), InstrumentConfig { limit: 600, predictor: None, quoting: None });

        // std historis spread basket
        let basket_std = 101.90140316248412;
        let baskets = vec![BasketConfig {
            basket: "GIFT_BASKET".into(),
            components: vec![
                Component { symbol: "CHOCOLATE".into(), weight: 4.0 },
                Component { symbol: "STRAWBERRIES".into(), weight: 6.0 },
                Component { symbol: "ROSES".into(), weight: 1.0 },
            ],
            fair_spread: 375.0,
            trade_at: basket_std * 0.5,
            close_at: basket_std * -1000.0,
            counter_step: 2,
            liquidity_divisor: 10,
        }];

        EngineConfig { instruments, baskets, conversions: 1 }
    }
}

/// JSON file -> EngineConfig; None -> built-in reference preset.
pub fn load_engine_config(path: Option<&str>) -> Result<EngineConfig, ConfigError> {
    let cfg = match path {
        None => EngineConfig::reference(),
        Some(p) => {
            let raw = fs::read_to_string(p).map_err(|source| ConfigError::Io { path: p.to_string(), source })?;
            serde_json::from_str(&raw).map_err(|source| ConfigError::Json { path: p.to_string(), source })?
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Runtime settings dari ENV (.env ikut dibaca). CLI flag di main.rs menimpa ini.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub engine_config: Option<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub record_file: Option<String>,
    pub metrics_port: Option<u16>,
    pub conversions: Option<i64>,
}

pub fn load() -> Settings {
    // Pastikan .env dibaca (agar RECORD_FILE, ENGINE_CONFIG, dll ter-load)
    let _ = dotenv();

    let non_empty = |key: &str| env::var(key).ok().filter(|s| !s.trim().is_empty());

    Settings {
        engine_config: non_empty("ENGINE_CONFIG"),
        input_file: non_empty("INPUT_FILE"),
        output_file: non_empty("OUTPUT_FILE"),
        record_file: non_empty("RECORD_FILE"),
        // tanpa METRICS_PORT -> exporter mati
        metrics_port: non_empty("METRICS_PORT").and_then(|s| s.parse().ok()),
        conversions: non_empty("CONVERSIONS").and_then(|s| s.parse().ok()),
    }
}
