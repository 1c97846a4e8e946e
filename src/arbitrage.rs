// ===============================
// src/arbitrage.rs (basket vs. synthetic)
// ===============================
//
// spread = mid(basket) - Σ weight_i * mid(component_i) - fair_spread
//
//   spread >  trade_at -> basket kemahalan -> jual basket di worst bid
//   spread < -trade_at -> basket kemurahan -> beli basket di worst ask
//   |spread| < close_at -> tutup posisi (close_at negatif = tidak pernah)
//
// Hysteresis counter direset kalau posisi sudah mentok limit atau sinyal
// arah berlawanan muncul.
//
use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::book::BookSummary;
use crate::config::ConfigError;
use crate::domain::{Order, Qty, Side, Symbol};
use crate::metrics::{ARB_PENDING, BASKET_SPREAD, ORDERS_BY};
use crate::risk::{check_sign, RiskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component { pub symbol: Symbol, pub weight: f64 }

fn default_counter_step() -> u32 { 2 }
fn default_liquidity_divisor() -> Qty { 10 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketConfig {
    pub basket: Symbol,
    pub components: Vec<Component>,
    /// Historically estimated mean of the raw spread.
    pub fair_spread: f64,
    pub trade_at: f64,
    pub close_at: f64,
    #[serde(default = "default_counter_step")]
    pub counter_step: u32,
    /// Liquid depth considered on the basket book is `limit / liquidity_divisor`.
    #[serde(default = "default_liquidity_divisor")]
    pub liquidity_divisor: Qty,
}

impl BasketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.components.is_empty() {
            return Err(ConfigError::Invalid(format!("{}: basket without components", self.basket)));
        }
        if !(self.trade_at >= 0.0) {
            return Err(ConfigError::Invalid(format!("{}: trade_at must be >= 0", self.basket)));
        }
        if self.liquidity_divisor <= 0 {
            return Err(ConfigError::Invalid(format!("{}: liquidity_divisor must be positive", self.basket)));
        }
        if self.components.iter().any(|c| c.symbol == self.basket) {
            return Err(ConfigError::Invalid(format!("{}: basket listed as its own component", self.basket)));
        }
        Ok(())
    }

    /// None when any leg lacks a two-sided book.
    pub fn spread(&self, books: &HashMap<Symbol, BookSummary>) -> Option<f64> {
        let mut synthetic = 0.0;
        for c in &self.components {
            synthetic += c.weight * books.get(&c.symbol)?.mid()?;
        }
        Some(books.get(&self.basket)?.mid()? - synthetic - self.fair_spread)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime { Neutral, SkewedLong, SkewedShort }

/// Hysteresis counters of one basket; survive across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageState {
    pub pending_buy_unfilled: u32,
    pub pending_sell_unfilled: u32,
}

impl ArbitrageState {
    pub fn regime(&self) -> Regime {
        match (self.pending_buy_unfilled > 0, self.pending_sell_unfilled > 0) {
            (true, false) => Regime::SkewedLong,
            (false, true) => Regime::SkewedShort,
            _ => Regime::Neutral,
        }
    }
}

fn emit(symbol: &str, side: Side, price: i64, size: Qty) -> Result<Order, RiskError> {
    let order = Order::new(symbol, side, price, size);
    check_sign(symbol, side, order.quantity)?;
    ORDERS_BY.with_label_values(&[symbol, "arb"]).inc();
    Ok(order)
}

/// One tick of the basket overlay. Returns at most one order, on the basket leg.
pub fn run_basket(
    cfg: &BasketConfig,
    state: &mut ArbitrageState,
    books: &HashMap<Symbol, BookSummary>,
    position: Qty,
    limit: Qty,
) -> Result<Option<Order>, RiskError> {
    // posisi mentok -> sisi itu tidak bisa nambah lagi
    if position == limit {
        state.pending_buy_unfilled = 0;
    }
    if position == -limit {
        state.pending_sell_unfilled = 0;
    }

    let order = match (cfg.spread(books), books.get(&cfg.basket)) {
        (Some(spread), Some(book)) => {
            BASKET_SPREAD.with_label_values(&[cfg.basket.as_str()]).set(spread);
            let liquid = limit / cfg.liquidity_divisor;
            debug!(
                basket = %cfg.basket,
                spread,
                liquid_bid = book.capped_bid_volume(liquid),
                liquid_ask = book.capped_ask_volume(liquid),
                "basket spread"
            );
            let order = decide(cfg, state, book, spread, position, limit)?;
            debug!(basket = %cfg.basket, regime = ?state.regime(), "basket regime");
            order
        }
        _ => {
            debug!(basket = %cfg.basket, "basket legs incomplete, skip");
            None
        }
    };

    ARB_PENDING.with_label_values(&[cfg.basket.as_str(), "buy"]).set(state.pending_buy_unfilled as i64);
    ARB_PENDING.with_label_values(&[cfg.basket.as_str(), "sell"]).set(state.pending_sell_unfilled as i64);
    Ok(order)
}

fn decide(
    cfg: &BasketConfig,
    state: &mut ArbitrageState,
    book: &BookSummary,
    spread: f64,
    position: Qty,
    limit: Qty,
) -> Result<Option<Order>, RiskError> {
    if spread > cfg.trade_at {
        state.pending_buy_unfilled = 0;
        let size = (position + limit).max(0);
        match book.worst_bid() {
            Some(px) if size > 0 => {
                state.pending_sell_unfilled = state.pending_sell_unfilled.saturating_add(cfg.counter_step);
                return emit(&cfg.basket, Side::Sell, px, size).map(Some);
            }
            _ => return Ok(None),
        }
    }
    if spread < -cfg.trade_at {
        state.pending_sell_unfilled = 0;
        let size = (limit - position).max(0);
        match book.worst_ask() {
            Some(px) if size > 0 => {
                state.pending_buy_unfilled = state.pending_buy_unfilled.saturating_add(cfg.counter_step);
                return emit(&cfg.basket, Side::Buy, px, size).map(Some);
            }
            _ => return Ok(None),
        }
    }
    if spread.abs() < cfg.close_at && position != 0 {
        let side = if position > 0 { Side::Sell } else { Side::Buy };
        let px = match side {
            Side::Sell => book.worst_bid(),
            Side::Buy => book.worst_ask(),
        };
        if let Some(px) = px {
            return emit(&cfg.basket, side, px, position.abs()).map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderDepth, Price};

    fn summary(sells: &[(Price, Qty)], buys: &[(Price, Qty)]) -> BookSummary {
        BookSummary::from_depth(&OrderDepth {
            sell_orders: sells.iter().copied().collect(),
            buy_orders: buys.iter().copied().collect(),
        })
    }

    /// Basket mid 500, one component with mid 495 and weight 1.
    fn setup(fair_spread: f64) -> (BasketConfig, HashMap<Symbol, BookSummary>) {
        let cfg = BasketConfig {
            basket: "BASKET".into(),
            components: vec![Component { symbol: "LEG".into(), weight: 1.0 }],
            fair_spread,
            trade_at: 3.0,
            close_at: -1000.0,
            counter_step: 2,
            liquidity_divisor: 10,
        };
        let mut books = HashMap::new();
        books.insert("BASKET".to_string(), summary(&[(501, -3), (503, -4)], &[(499, 2), (496, 5)]));
        books.insert("LEG".to_string(), summary(&[(496, -10)], &[(494, 10)]));
        (cfg, books)
    }

    #[test]
    fn spread_uses_weighted_mids() {
        let (cfg, books) = setup(0.0);
        assert_eq!(cfg.spread(&books), Some(5.0));
    }

    #[test]
    fn overpriced_basket_sells_full_short_capacity_at_worst_bid() {
        let (cfg, books) = setup(0.0);
        let mut st = ArbitrageState { pending_buy_unfilled: 4, pending_sell_unfilled: 0 };
        let o = run_basket(&cfg, &mut st, &books, 10, 60).unwrap().unwrap();
        assert_eq!(o, Order { symbol: "BASKET".into(), price: 496, quantity: -70 });
        assert_eq!(st, ArbitrageState { pending_buy_unfilled: 0, pending_sell_unfilled: 2 });
        assert_eq!(st.regime(), Regime::SkewedShort);
    }

    #[test]
    fn underpriced_basket_buys_at_worst_ask() {
        let (cfg, books) = setup(10.0);
        let mut st = ArbitrageState { pending_buy_unfilled: 0, pending_sell_unfilled: 6 };
        let o = run_basket(&cfg, &mut st, &books, 0, 60).unwrap().unwrap();
        assert_eq!(o, Order { symbol: "BASKET".into(), price: 503, quantity: 60 });
        assert_eq!(st, ArbitrageState { pending_buy_unfilled: 2, pending_sell_unfilled: 0 });
    }

    #[test]
    fn inside_threshold_no_order_counters_kept() {
        let (cfg, books) = setup(4.0);
        let mut st = ArbitrageState { pending_buy_unfilled: 2, pending_sell_unfilled: 4 };
        assert!(run_basket(&cfg, &mut st, &books, 5, 60).unwrap().is_none());
        assert_eq!(st, ArbitrageState { pending_buy_unfilled: 2, pending_sell_unfilled: 4 });
    }

    #[test]
    fn saturation_resets_counter_without_signal() {
        let (cfg, books) = setup(4.0);
        let mut st = ArbitrageState { pending_buy_unfilled: 6, pending_sell_unfilled: 4 };
        assert!(run_basket(&cfg, &mut st, &books, 60, 60).unwrap().is_none());
        assert_eq!(st.pending_buy_unfilled, 0);
        assert_eq!(st.pending_sell_unfilled, 4);

        run_basket(&cfg, &mut st, &books, -60, 60).unwrap();
        assert_eq!(st.pending_sell_unfilled, 0);
    }

    #[test]
    fn saturated_short_with_sell_signal_emits_nothing() {
        let (cfg, books) = setup(0.0);
        let mut st = ArbitrageState::default();
        assert!(run_basket(&cfg, &mut st, &books, -60, 60).unwrap().is_none());
        assert_eq!(st, ArbitrageState::default());
    }

    #[test]
    fn close_threshold_flattens_when_enabled() {
        let (mut cfg, books) = setup(4.0);
        cfg.close_at = 2.0;
        let mut st = ArbitrageState::default();
        let o = run_basket(&cfg, &mut st, &books, -7, 60).unwrap().unwrap();
        assert_eq!(o, Order { symbol: "BASKET".into(), price: 503, quantity: 7 });
    }

    #[test]
    fn large_counter_step_saturates() {
        let (mut cfg, books) = setup(0.0);
        cfg.counter_step = u32::MAX;
        let mut st = ArbitrageState::default();
        for _ in 0..2 {
            let o = run_basket(&cfg, &mut st, &books, 0, 60).unwrap().unwrap();
            assert_eq!(o.quantity, -60);
        }
        assert_eq!(st.pending_sell_unfilled, u32::MAX);
        assert_eq!(st.regime(), Regime::SkewedShort);
    }

    #[test]
    fn missing_leg_skips_basket() {
        let (cfg, mut books) = setup(0.0);
        books.remove("LEG");
        let mut st = ArbitrageState::default();
        assert!(run_basket(&cfg, &mut st, &books, 0, 60).unwrap().is_none());
    }
}
