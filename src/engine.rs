// ===============================
// src/engine.rs (tick orchestrator)
// ===============================
//
// Alur per tick:
//   a) inventory ditimpa snapshot harness
//   b) history cache per feature: evict + append, dicap nomor tick
//   c) fair-value band per instrumen
//   d) engine single-instrument untuk yang punya quoting + book
//   e) overlay arbitrage basket
//   f) agregasi + invariant check per instrumen
//   g) batch + conversions + trader_data
//
// Tidak ada I/O di sini. State yang harus hidup lintas proses (history,
// hysteresis counter) dibawa lewat `trader_data` sebagai JSON.
//
use std::collections::BTreeMap;

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::arbitrage::{run_basket, ArbitrageState};
use crate::book::BookSummary;
use crate::config::{ConfigError, EngineConfig};
use crate::domain::{OrderBatch, Symbol, TickOutput, TradingState};
use crate::history::{Feature, HistoryCache, Sample};
use crate::metrics::{COLD_PREDICTOR, FAIR_VALUE, SKIPPED_BOOK, TICKS};
use crate::positions::Inventory;
use crate::predictor::{FairValueBand, PredictorConfig};
use crate::risk::{check_orders, RiskError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Risk(#[from] RiskError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("trader_data encode: {0}")]
    State(#[from] serde_json::Error),
}

/// What goes into `trader_data` between ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub ticks: u64,
    /// `[tick, value]` pairs per feature key, oldest first.
    #[serde(default)]
    pub history: BTreeMap<String, Vec<Sample>>,
    #[serde(default)]
    pub baskets: BTreeMap<Symbol, ArbitrageState>,
}

pub struct Trader {
    cfg: EngineConfig,
    features: BTreeMap<Feature, usize>,
    history: HistoryCache,
    arb_states: BTreeMap<Symbol, ArbitrageState>,
    inventory: Inventory,
    ticks: u64,
    started: bool,
}

impl Trader {
    pub fn new(cfg: EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let features = cfg.tracked_features();
        let mut history = HistoryCache::default();
        for (f, w) in &features {
            history.track(f, *w);
        }
        let arb_states = cfg
            .baskets
            .iter()
            .map(|b| (b.basket.clone(), ArbitrageState::default()))
            .collect();
        Ok(Self {
            cfg,
            features,
            history,
            arb_states,
            inventory: Inventory::default(),
            ticks: 0,
            started: false,
        })
    }

    pub fn config(&self) -> &EngineConfig { &self.cfg }
    pub fn history(&self) -> &HistoryCache { &self.history }
    pub fn ticks(&self) -> u64 { self.ticks }
    pub fn inventory(&self) -> &Inventory { &self.inventory }

    pub fn arbitrage_state(&self, basket: &str) -> Option<&ArbitrageState> {
        self.arb_states.get(basket)
    }

    pub fn snapshot(&self) -> EngineState {
        EngineState {
            ticks: self.ticks,
            history: self.history.dump(),
            baskets: self.arb_states.clone(),
        }
    }

    /// Only configured features and baskets are taken from `st`.
    pub fn restore(&mut self, st: &EngineState) {
        self.history.load(&st.history);
        for (basket, s) in self.arb_states.iter_mut() {
            *s = st.baskets.get(basket).copied().unwrap_or_default();
        }
        self.ticks = st.ticks;
    }

    pub fn encode_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Band for one instrument from the current cache. No predictor = Unbounded.
    pub fn band(&self, symbol: &str) -> FairValueBand {
        self.cfg
            .instruments
            .get(symbol)
            .and_then(|i| i.predictor.as_ref())
            .map_or(FairValueBand::Unbounded, |p| p.band(&self.history))
    }

    pub fn run(&mut self, state: &TradingState) -> Result<TickOutput, EngineError> {
        // state lintas proses hanya dipulihkan di tick pertama instance ini
        if !self.started && !state.trader_data.is_empty() {
            match serde_json::from_str::<EngineState>(&state.trader_data) {
                Ok(st) => {
                    self.restore(&st);
                    debug!(ticks = st.ticks, "engine state restored from trader_data");
                }
                Err(e) => warn!(?e, "trader_data unreadable, starting cold"),
            }
        }
        self.started = true;
        TICKS.inc();

        // a) inventory
        self.inventory.ingest(&state.position);

        let books: HashMap<Symbol, BookSummary> = state
            .order_depths
            .iter()
            .map(|(sym, d)| (sym.clone(), BookSummary::from_depth(d)))
            .collect();

        // b) history
        self.update_history(&books, state);

        // c) bands
        let mut bands: BTreeMap<&str, FairValueBand> = BTreeMap::new();
        for (sym, inst) in &self.cfg.instruments {
            let Some(p) = &inst.predictor else { continue };
            let band = p.band(&self.history);
            match band {
                FairValueBand::Bounded { lower, upper } => {
                    FAIR_VALUE.with_label_values(&[sym.as_str(), "lower"]).set(lower as f64);
                    FAIR_VALUE.with_label_values(&[sym.as_str(), "upper"]).set(upper as f64);
                }
                FairValueBand::Unbounded => {
                    if matches!(p, PredictorConfig::Regression { .. }) {
                        COLD_PREDICTOR.with_label_values(&[sym.as_str()]).inc();
                    }
                }
            }
            bands.insert(sym.as_str(), band);
        }

        // d) single-instrument engines
        let mut orders: OrderBatch = BTreeMap::new();
        for (sym, inst) in &self.cfg.instruments {
            let Some(style) = &inst.quoting else { continue };
            let Some(book) = books.get(sym) else {
                SKIPPED_BOOK.with_label_values(&[sym.as_str()]).inc();
                debug!(symbol = %sym, "no book this tick, skip");
                continue;
            };
            let band = bands.get(sym.as_str()).copied().unwrap_or(FairValueBand::Unbounded);
            let position = self.inventory.position(sym);
            let out = style.run(sym, book, band, position, inst.limit)?;
            if !out.is_empty() {
                orders.entry(sym.clone()).or_default().extend(out);
            }
        }

        // e) basket overlay
        for b in &self.cfg.baskets {
            let Some(limit) = self.cfg.limit(&b.basket) else { continue };
            let st = self.arb_states.entry(b.basket.clone()).or_default();
            let position = self.inventory.position(&b.basket);
            if let Some(o) = run_basket(b, st, &books, position, limit)? {
                orders.entry(b.basket.clone()).or_default().push(o);
            }
        }

        // f) invariant per instrumen, per sisi
        for (sym, list) in &orders {
            let limit = self.cfg.limit(sym).unwrap_or(0);
            check_orders(sym, list, self.inventory.position(sym), limit)?;
        }

        // g)
        self.ticks += 1;
        let out = TickOutput {
            timestamp: state.timestamp,
            orders,
            conversions: self.cfg.conversions,
            trader_data: self.encode_state()?,
        };
        debug!(ts = state.timestamp, tick = self.ticks, orders = out.order_count(), "tick done");
        Ok(out)
    }

    fn update_history(&mut self, books: &HashMap<Symbol, BookSummary>, state: &TradingState) {
        for f in self.features.keys() {
            let v = match f {
                Feature::Mid(sym) => books.get(sym).and_then(BookSummary::mid),
                Feature::Observation(key) => state.observations.get(key).copied(),
            };
            match v {
                Some(v) => self.history.push(f, self.ticks, v),
                // window tidak digeser; predictor multi-feature jadi Unbounded
                // sampai semua window kembali sejajar per tick
                None => debug!(feature = %f, tick = self.ticks, "feature missing this tick, history unchanged"),
            }
        }
    }
}
