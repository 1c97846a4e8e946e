// ===============================
// src/domain.rs
// ===============================
use std::collections::BTreeMap;

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

pub type Symbol = String;
/// Harga dalam satuan tick integer.
pub type Price = i64;
/// Quantity bertanda: positif = buy, negatif = sell.
pub type Qty = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }

impl Side {
    pub fn sign(&self) -> i64 { match self { Side::Buy => 1, Side::Sell => -1 } }
}

/// Limit order untuk satu ronde matching. Arah ditentukan oleh tanda `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order { pub symbol: Symbol, pub price: Price, pub quantity: Qty }

impl Order {
    pub fn new(symbol: &str, side: Side, price: Price, size: Qty) -> Self {
        Self { symbol: symbol.to_string(), price, quantity: side.sign() * size }
    }

    pub fn side(&self) -> Option<Side> {
        match self.quantity.signum() {
            1 => Some(Side::Buy),
            -1 => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Raw book as delivered by the harness: sell volumes negative, buy volumes positive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderDepth {
    #[serde(default)]
    pub buy_orders: HashMap<Price, Qty>,
    #[serde(default)]
    pub sell_orders: HashMap<Price, Qty>,
}

/// Everything the harness hands over for one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingState {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub trader_data: String,
    #[serde(default)]
    pub order_depths: HashMap<Symbol, OrderDepth>,
    #[serde(default)]
    pub position: HashMap<Symbol, Qty>,
    // observasi tambahan (sunlight, humidity, tariff, ...) -> opaque numeric
    #[serde(default)]
    pub observations: HashMap<String, f64>,
}

pub type OrderBatch = BTreeMap<Symbol, Vec<Order>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickOutput {
    pub timestamp: i64,
    pub orders: OrderBatch,
    pub conversions: i64,
    pub trader_data: String,
}

impl TickOutput {
    pub fn order_count(&self) -> usize { self.orders.values().map(Vec::len).sum() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSummary { pub timestamp: i64, pub books: usize, pub positions: BTreeMap<Symbol, Qty> }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event { Tick(TickSummary), Out(TickOutput), Note(String) }
