// ===============================
// src/strategy.rs (single-instrument engine)
// ===============================
//
// Dua gaya quoting:
// 1) MarketMake (default)
//    - price-taking: hit resting order yang harganya masuk fair-value band
//    - passive quote: undercut best price satu tick, dibatasi band
//    - skew tiers (opsional): order tambahan satu tick lebih/kurang agresif
//      tergantung inventory, supaya posisi balik ke nol
// 2) DeviationTaker
//    - kalau mid menyimpang dari pusat band lebih dari `edge`, ambil best level
//
// Catatan sisi:
// - Tiap sisi dihitung dari posisi awal tick (bukan hasil sisi lain).
//   Dalam satu sisi, price-taking + skew + passive berbagi kapasitas yang sama.
// - Sisi sell dihitung dengan harga dicerminkan (p -> -p) supaya aturannya
//   identik dengan sisi buy: lebih kecil = lebih bagus, `min` = lebih konservatif.
//
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::book::{BookSummary, Level};
use crate::config::ConfigError;
use crate::domain::{Order, Price, Qty, Side};
use crate::metrics::ORDERS_BY;
use crate::predictor::FairValueBand;
use crate::risk::{check_sign, RiskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum QuoteStyle {
    MarketMake(MarketMakeParams),
    DeviationTaker { edge: f64 },
}

impl QuoteStyle {
    pub fn validate(&self, symbol: &str) -> Result<(), ConfigError> {
        match self {
            QuoteStyle::MarketMake(p) => {
                if p.passive_chunk.is_some_and(|c| c <= 0) {
                    return Err(ConfigError::Invalid(format!("{symbol}: passive_chunk must be positive")));
                }
                if let Some(t) = &p.skew {
                    if t.chunk <= 0 {
                        return Err(ConfigError::Invalid(format!("{symbol}: skew chunk must be positive")));
                    }
                }
                Ok(())
            }
            QuoteStyle::DeviationTaker { edge } if *edge < 0.0 || edge.is_nan() => {
                Err(ConfigError::Invalid(format!("{symbol}: deviation edge must be >= 0")))
            }
            QuoteStyle::DeviationTaker { .. } => Ok(()),
        }
    }

    pub fn run(
        &self,
        symbol: &str,
        book: &BookSummary,
        band: FairValueBand,
        position: Qty,
        limit: Qty,
    ) -> Result<Vec<Order>, RiskError> {
        match self {
            QuoteStyle::MarketMake(p) => make_market(symbol, p, book, band, position, limit),
            QuoteStyle::DeviationTaker { edge } => take_deviation(symbol, *edge, book, band, position, limit),
        }
    }
}

/// Tuning knobs of the market-making style.
///
/// The empirically tuned offsets are kept as parameters: `take_offset = 1`
/// with `quote_offset = 1` gives the tight-spread behaviour (strictly inside
/// the band), `0`/`0` the regression behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMakeParams {
    /// Take resting orders up to `band edge - take_offset`.
    pub take_offset: Price,
    /// While holding the opposite inventory, also take one tick past the edge.
    pub unwind_concession: bool,
    /// Passive quotes never go past `band edge - quote_offset`.
    pub quote_offset: Price,
    /// Max size of the plain passive quote. None = all remaining capacity.
    pub passive_chunk: Option<Qty>,
    pub skew: Option<SkewTiers>,
}

impl Default for MarketMakeParams {
    fn default() -> Self {
        Self { take_offset: 0, unwind_concession: true, quote_offset: 0, passive_chunk: None, skew: None }
    }
}

/// Extra quotes keyed on inventory, expressed for the buy side and mirrored
/// for sells: below `aggressive_below` bid one tick sharper, above
/// `passive_above` bid one tick softer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewTiers {
    pub aggressive_below: Qty,
    pub passive_above: Qty,
    pub chunk: Qty,
}

impl Default for SkewTiers {
    fn default() -> Self { Self { aggressive_below: 0, passive_above: 15, chunk: 40 } }
}

/// One side of the book seen from the direction we trade, prices mirrored for sells.
struct SideView<'a> {
    side: Side,
    take_from: &'a [Level],
    own_best: Option<Price>,
    acceptable: Option<Price>,
    position: Qty,
}

impl<'a> SideView<'a> {
    fn new(side: Side, book: &'a BookSummary, band: FairValueBand, position: Qty) -> Self {
        match side {
            Side::Buy => Self {
                side,
                take_from: &book.asks,
                own_best: book.best_bid(),
                acceptable: band.lower(),
                position,
            },
            Side::Sell => Self {
                side,
                take_from: &book.bids,
                own_best: book.best_ask().map(|p| -p),
                acceptable: band.upper().map(|p| -p),
                position: -position,
            },
        }
    }

    /// Mirror between real and side-local prices (its own inverse).
    fn flip(&self, p: Price) -> Price { self.side.sign() * p }

    /// Passive price `shift` ticks sharper than the undercut, capped by the band.
    fn passive_price(&self, quote_offset: Price, shift: Price) -> Option<Price> {
        let undercut = self.own_best.map(|b| b + 1 + shift);
        let cap = self.acceptable.map(|a| a - quote_offset);
        match (undercut, cap) {
            (Some(u), Some(c)) => Some(u.min(c)),
            (Some(u), None) => Some(u),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        }
    }
}

fn emit(out: &mut Vec<Order>, symbol: &str, side: Side, price: Price, size: Qty, kind: &str) -> Result<(), RiskError> {
    debug_assert!(size > 0, "{symbol}: non-positive {kind} size {size}");
    let order = Order::new(symbol, side, price, size);
    check_sign(symbol, side, order.quantity)?;
    ORDERS_BY.with_label_values(&[symbol, kind]).inc();
    out.push(order);
    Ok(())
}

pub fn make_market(
    symbol: &str,
    params: &MarketMakeParams,
    book: &BookSummary,
    band: FairValueBand,
    position: Qty,
    limit: Qty,
) -> Result<Vec<Order>, RiskError> {
    let mut out = Vec::new();
    for side in [Side::Buy, Side::Sell] {
        let view = SideView::new(side, book, band, position);
        quote_side(&mut out, symbol, params, &view, limit)?;
    }
    debug!(symbol, position, ?band, orders = out.len(), "market make");
    Ok(out)
}

fn quote_side(
    out: &mut Vec<Order>,
    symbol: &str,
    params: &MarketMakeParams,
    v: &SideView<'_>,
    limit: Qty,
) -> Result<(), RiskError> {
    let mut cpos = v.position;

    // 1) price-taking, hanya kalau band sudah ada
    if let Some(acc) = v.acceptable {
        let edge = acc - params.take_offset;
        for lvl in v.take_from {
            if cpos >= limit {
                break;
            }
            let p = v.flip(lvl.price);
            let concede = params.unwind_concession && v.position < 0 && p == edge + 1;
            if p > edge && !concede {
                continue;
            }
            let size = lvl.volume.min(limit - cpos);
            emit(out, symbol, v.side, lvl.price, size, "take")?;
            cpos += size;
        }
    }

    // 2) skew tiers, lalu passive quote dengan sisa kapasitas
    let mut post = |shift: Price, chunk: Option<Qty>, kind: &str, cpos: &mut Qty| -> Result<(), RiskError> {
        if *cpos >= limit {
            return Ok(());
        }
        let Some(px) = v.passive_price(params.quote_offset, shift) else {
            return Ok(());
        };
        let size = chunk.map_or(limit - *cpos, |c| c.min(limit - *cpos));
        emit(out, symbol, v.side, v.flip(px), size, kind)?;
        *cpos += size;
        Ok(())
    };

    if let Some(t) = &params.skew {
        if v.position < t.aggressive_below {
            post(1, Some(t.chunk), "skew", &mut cpos)?;
        }
        if v.position > t.passive_above {
            post(-1, Some(t.chunk), "skew", &mut cpos)?;
        }
    }
    post(0, params.passive_chunk, "passive", &mut cpos)?;

    debug_assert!(cpos <= limit, "{symbol}: {:?} side projected {cpos} past limit {limit}", v.side);
    Ok(())
}

/// Hit the best level when the mid strays more than `edge` from the band centre.
pub fn take_deviation(
    symbol: &str,
    edge: f64,
    book: &BookSummary,
    band: FairValueBand,
    position: Qty,
    limit: Qty,
) -> Result<Vec<Order>, RiskError> {
    let mut out = Vec::new();
    let (Some(lower), Some(upper), Some(mid)) = (band.lower(), band.upper(), book.mid()) else {
        return Ok(out);
    };
    let center = (lower + upper) as f64 / 2.0;

    if mid < center - edge {
        if let Some(best) = book.asks.first() {
            let size = best.volume.min(limit - position);
            if size > 0 {
                emit(&mut out, symbol, Side::Buy, best.price, size, "deviation")?;
            }
        }
    } else if mid > center + edge {
        if let Some(best) = book.bids.first() {
            let size = best.volume.min(limit + position);
            if size > 0 {
                emit(&mut out, symbol, Side::Sell, best.price, size, "deviation")?;
            }
        }
    }
    debug!(symbol, mid, center, edge, orders = out.len(), "deviation taker");
    Ok(out)
}
