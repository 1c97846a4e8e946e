// ===============================
// src/positions.rs (inventory snapshot)
// ===============================

use ahash::AHashMap as HashMap;
use std::collections::BTreeMap;

use crate::domain::{Qty, Symbol};
use crate::metrics::POSITION;

/// Signed position per instrument, overwritten from the harness every tick.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    positions: HashMap<Symbol, Qty>,
}

impl Inventory {
    /// Replace everything with the harness snapshot; symbols absent from it are flat.
    pub fn ingest(&mut self, snapshot: &HashMap<Symbol, Qty>) {
        self.positions.clear();
        for (sym, qty) in snapshot.iter() {
            self.positions.insert(sym.clone(), *qty);
            POSITION.with_label_values(&[sym.as_str()]).set(*qty);
        }
    }

    pub fn position(&self, symbol: &str) -> Qty {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<Symbol, Qty> {
        self.positions.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}
