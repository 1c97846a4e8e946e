// ===============================
// src/lib.rs
// ===============================
pub mod domain;
pub mod config;
pub mod metrics;
pub mod recorder;
pub mod book;
pub mod history;
pub mod predictor;
pub mod strategy;
pub mod arbitrage;
pub mod risk;
pub mod positions;
pub mod engine;

pub use config::{load_engine_config, ConfigError, EngineConfig, InstrumentConfig};
pub use domain::{Order, OrderDepth, TickOutput, TradingState};
pub use engine::{EngineError, EngineState, Trader};
pub use predictor::FairValueBand;
