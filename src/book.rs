// ===============================
// src/book.rs (order book summarizer)
// ===============================
//
// Ringkasan satu snapshot book:
// - asks: ascending (best ask dulu), bids: descending (best bid dulu)
// - volume disimpan sebagai magnitude positif
// - level dengan volume 0 dibuang
//
use crate::domain::{OrderDepth, Price, Qty};

/// One resting price level. `volume` is always a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level { pub price: Price, pub volume: Qty }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSummary {
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
}

impl BookSummary {
    pub fn from_depth(depth: &OrderDepth) -> Self {
        let mut asks: Vec<Level> = depth
            .sell_orders
            .iter()
            .filter(|(_, v)| **v != 0)
            .map(|(p, v)| Level { price: *p, volume: v.abs() })
            .collect();
        asks.sort_by_key(|l| l.price);

        let mut bids: Vec<Level> = depth
            .buy_orders
            .iter()
            .filter(|(_, v)| **v != 0)
            .map(|(p, v)| Level { price: *p, volume: v.abs() })
            .collect();
        bids.sort_by_key(|l| std::cmp::Reverse(l.price));

        Self { asks, bids }
    }

    pub fn best_ask(&self) -> Option<Price> { self.asks.first().map(|l| l.price) }
    pub fn worst_ask(&self) -> Option<Price> { self.asks.last().map(|l| l.price) }
    pub fn best_bid(&self) -> Option<Price> { self.bids.first().map(|l| l.price) }
    pub fn worst_bid(&self) -> Option<Price> { self.bids.last().map(|l| l.price) }

    pub fn is_two_sided(&self) -> bool { !self.asks.is_empty() && !self.bids.is_empty() }

    /// `(best_ask + best_bid) / 2`, fractional. None when either side is empty.
    pub fn mid(&self) -> Option<f64> {
        Some((self.best_ask()? + self.best_bid()?) as f64 / 2.0)
    }

    pub fn ask_volume(&self) -> Qty { self.asks.iter().map(|l| l.volume).sum() }
    pub fn bid_volume(&self) -> Qty { self.bids.iter().map(|l| l.volume).sum() }

    /// Cumulative ask volume from the best level, stopping at the first level
    /// where the running total reaches `cap` (that level is still counted).
    pub fn capped_ask_volume(&self, cap: Qty) -> Qty { capped(&self.asks, cap) }
    pub fn capped_bid_volume(&self, cap: Qty) -> Qty { capped(&self.bids, cap) }
}

fn capped(ladder: &[Level], cap: Qty) -> Qty {
    let mut total = 0;
    for l in ladder {
        total += l.volume;
        if total >= cap {
            break;
        }
    }
    total
}
