// ===============================
// src/risk.rs
// ===============================
//
// Invariant check per batch per instrument sebelum dikirim ke harness:
// 1) tidak ada quantity nol
// 2) tanda quantity konsisten dengan side yang dimaksud
// 3) kalau semua buy (atau semua sell) terisi penuh, posisi tetap di [-limit, limit]
//
// Pelanggaran = bug aritmatika engine sendiri, bukan error data -> fatal.
//
use thiserror::Error;

use crate::domain::{Order, Qty, Side};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("{symbol}: zero quantity order at {price}")]
    ZeroQuantity { symbol: String, price: i64 },
    #[error("{symbol}: {side:?} order carries quantity {qty}")]
    SignMismatch { symbol: String, side: Side, qty: Qty },
    #[error("{symbol}: {side:?} orders move position {position} to {projected}, limit {limit}")]
    LimitBreach { symbol: String, side: Side, position: Qty, projected: Qty, limit: Qty },
}

/// Check that a computed size matches the side it is meant for.
pub fn check_sign(symbol: &str, side: Side, qty: Qty) -> Result<(), RiskError> {
    let ok = match side {
        Side::Buy => qty > 0,
        Side::Sell => qty < 0,
    };
    if ok {
        Ok(())
    } else {
        Err(RiskError::SignMismatch { symbol: symbol.to_string(), side, qty })
    }
}

/// Full-fill projection of one instrument's batch, each side on its own.
pub fn check_orders(symbol: &str, orders: &[Order], position: Qty, limit: Qty) -> Result<(), RiskError> {
    let mut buys: Qty = 0;
    let mut sells: Qty = 0;
    for o in orders {
        match o.side() {
            Some(Side::Buy) => buys += o.quantity,
            Some(Side::Sell) => sells += o.quantity,
            None => return Err(RiskError::ZeroQuantity { symbol: symbol.to_string(), price: o.price }),
        }
    }

    if buys > 0 && position + buys > limit {
        return Err(RiskError::LimitBreach {
            symbol: symbol.to_string(),
            side: Side::Buy,
            position,
            projected: position + buys,
            limit,
        });
    }
    if sells < 0 && position + sells < -limit {
        return Err(RiskError::LimitBreach {
            symbol: symbol.to_string(),
            side: Side::Sell,
            position,
            projected: position + sells,
            limit,
        });
    }
    Ok(())
}
