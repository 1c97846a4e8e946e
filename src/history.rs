// ===============================
// src/history.rs (bounded price history)
// ===============================
//
// FIFO per feature: kalau sudah penuh, buang yang paling lama lalu append.
// Urutan penting (oldest -> newest) karena langsung dipakai sebagai index
// koefisien regresi. Tiap nilai dicap nomor tick engine supaya predictor
// bisa cek window antar feature berasal dari tick yang sama.
//
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Symbol;

/// A series the engine tracks tick by tick.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Mid-price of an instrument's current book.
    Mid(Symbol),
    /// Auxiliary observation supplied by the harness, by name.
    Observation(String),
}

impl Feature {
    pub fn key(&self) -> String { self.to_string() }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Mid(s) => write!(f, "mid:{}", s),
            Feature::Observation(k) => write!(f, "obs:{}", k),
        }
    }
}

/// One stored value with the engine tick it was observed on.
pub type Sample = (u64, f64);

#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    cap: usize,
    window: VecDeque<Sample>,
}

impl PriceHistory {
    pub fn new(cap: usize) -> Self {
        Self { cap, window: VecDeque::with_capacity(cap) }
    }

    pub fn push(&mut self, tick: u64, v: f64) {
        if self.window.len() == self.cap {
            self.window.pop_front();
        }
        self.window.push_back((tick, v));
    }

    pub fn len(&self) -> usize { self.window.len() }
    pub fn is_empty(&self) -> bool { self.window.is_empty() }
    pub fn capacity(&self) -> usize { self.cap }

    fn newest(&self, n: usize) -> Option<impl Iterator<Item = &Sample> + '_> {
        if n == 0 || self.window.len() < n {
            return None;
        }
        Some(self.window.iter().skip(self.window.len() - n))
    }

    /// The newest `n` values, oldest first. None until at least `n` are held.
    pub fn last_n(&self, n: usize) -> Option<impl Iterator<Item = f64> + '_> {
        Some(self.newest(n)?.map(|(_, v)| *v))
    }

    /// Ticks of the newest `n` values, oldest first.
    pub fn last_n_ticks(&self, n: usize) -> Option<impl Iterator<Item = u64> + '_> {
        Some(self.newest(n)?.map(|(t, _)| *t))
    }

    pub fn values(&self) -> Vec<f64> { self.window.iter().map(|(_, v)| *v).collect() }
    pub fn samples(&self) -> Vec<Sample> { self.window.iter().copied().collect() }
}

/// All tracked series, keyed by `Feature::key()`.
#[derive(Debug, Clone, Default)]
pub struct HistoryCache {
    series: BTreeMap<String, PriceHistory>,
}

impl HistoryCache {
    /// Register a feature. Tracking the same feature twice keeps the larger window.
    pub fn track(&mut self, feature: &Feature, window: usize) {
        let entry = self
            .series
            .entry(feature.key())
            .or_insert_with(|| PriceHistory::new(window));
        if entry.cap < window {
            let mut grown = PriceHistory::new(window);
            for (t, v) in entry.window.drain(..) {
                grown.push(t, v);
            }
            *entry = grown;
        }
    }

    pub fn push(&mut self, feature: &Feature, tick: u64, v: f64) {
        if let Some(h) = self.series.get_mut(&feature.key()) {
            h.push(tick, v);
        }
    }

    pub fn get(&self, feature: &Feature) -> Option<&PriceHistory> {
        self.series.get(&feature.key())
    }

    /// Raw contents for state persistence.
    pub fn dump(&self) -> BTreeMap<String, Vec<Sample>> {
        self.series.iter().map(|(k, h)| (k.clone(), h.samples())).collect()
    }

    /// Refill tracked series from a dump. Unknown keys are ignored and
    /// longer dumps keep only their newest values.
    pub fn load(&mut self, dump: &BTreeMap<String, Vec<Sample>>) {
        for (k, h) in self.series.iter_mut() {
            h.window.clear();
            if let Some(vals) = dump.get(k) {
                for (t, v) in vals {
                    h.push(*t, *v);
                }
            }
        }
    }
}
