// ===============================
// tests/engine.rs
// ===============================
use std::collections::BTreeMap;

use tick_trader::config::InstrumentConfig;
use tick_trader::domain::{Price, Qty};
use tick_trader::history::Feature;
use tick_trader::predictor::PredictorConfig;
use tick_trader::strategy::{MarketMakeParams, QuoteStyle};
use tick_trader::{EngineConfig, FairValueBand, OrderDepth, TickOutput, Trader, TradingState};

fn depth(sells: &[(Price, Qty)], buys: &[(Price, Qty)]) -> OrderDepth {
    OrderDepth {
        sell_orders: sells.iter().copied().collect(),
        buy_orders: buys.iter().copied().collect(),
    }
}

fn pairs(out: &TickOutput, sym: &str) -> Vec<(Price, Qty)> {
    out.orders
        .get(sym)
        .map(|v| v.iter().map(|o| (o.price, o.quantity)).collect())
        .unwrap_or_default()
}

/// STARFRUIT book with mid 4999.5 every tick.
fn starfruit_tick(ts: i64, position: Qty) -> TradingState {
    let mut st = TradingState { timestamp: ts, ..Default::default() };
    st.order_depths.insert("STARFRUIT".into(), depth(&[(5001, -4), (5004, -6)], &[(4998, 5), (4995, 5)]));
    st.position.insert("STARFRUIT".into(), position);
    st
}

#[test]
fn regression_quotes_book_only_until_warm() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();

    for ts in 0..3 {
        let out = t.run(&starfruit_tick(ts * 100, 0)).unwrap();
        // cold: undercut kedua sisi, tanpa price-taking
        assert_eq!(pairs(&out, "STARFRUIT"), vec![(4999, 20), (5000, -20)]);
        assert_eq!(t.band("STARFRUIT"), FairValueBand::Unbounded);
    }

    // tick ke-4: prediksi 4999.27 -> 4999, band [4998, 5000]
    let out = t.run(&starfruit_tick(300, 0)).unwrap();
    assert_eq!(t.band("STARFRUIT"), FairValueBand::Bounded { lower: 4998, upper: 5000 });
    assert_eq!(pairs(&out, "STARFRUIT"), vec![(4998, 20), (5000, -20)]);
}

#[test]
fn history_never_grows_past_window() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();
    for ts in 0..25 {
        t.run(&starfruit_tick(ts, 0)).unwrap();
    }
    let h = t.history().get(&Feature::Mid("STARFRUIT".into())).unwrap();
    assert_eq!(h.len(), 4);
    assert_eq!(h.values(), vec![4999.5; 4]);
    assert_eq!(t.ticks(), 25);
}

#[test]
fn one_sided_book_leaves_mid_history_unchanged() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();
    for ts in 0..2 {
        t.run(&starfruit_tick(ts, 0)).unwrap();
    }

    let mut st = TradingState { timestamp: 2, ..Default::default() };
    st.order_depths.insert("STARFRUIT".into(), depth(&[(5001, -4), (5004, -6)], &[]));
    let out = t.run(&st).unwrap();
    // masih cold, tanpa bid: hanya ask undercut
    assert_eq!(pairs(&out, "STARFRUIT"), vec![(5000, -20)]);

    let h = t.history().get(&Feature::Mid("STARFRUIT".into())).unwrap();
    assert_eq!(h.samples(), vec![(0, 4999.5), (1, 4999.5)]);
    assert_eq!(t.ticks(), 3);
}

#[test]
fn fresh_instance_resumes_from_trader_data() {
    let mut a = Trader::new(EngineConfig::reference()).unwrap();
    let mut last = String::new();
    for ts in 0..3 {
        last = a.run(&starfruit_tick(ts, 0)).unwrap().trader_data;
    }

    let mut resumed = Trader::new(EngineConfig::reference()).unwrap();
    let mut st = starfruit_tick(3, 0);
    st.trader_data = last;
    let out = resumed.run(&st).unwrap();
    assert_eq!(pairs(&out, "STARFRUIT"), vec![(4998, 20), (5000, -20)]);
    assert_eq!(resumed.ticks(), 4);

    // tanpa trader_data: masih cold
    let mut cold = Trader::new(EngineConfig::reference()).unwrap();
    let out = cold.run(&starfruit_tick(3, 0)).unwrap();
    assert_eq!(pairs(&out, "STARFRUIT"), vec![(4999, 20), (5000, -20)]);
}

#[test]
fn amethysts_skew_and_limit_hold_over_positions() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();
    for pos in -20..=20 {
        let mut st = TradingState { timestamp: 0, ..Default::default() };
        st.order_depths.insert(
            "AMETHYSTS".into(),
            depth(&[(9998, -2), (10002, -5), (10005, -10)], &[(10001, 3), (9996, 4), (9995, 10)]),
        );
        st.position.insert("AMETHYSTS".into(), pos);
        let out = t.run(&st).unwrap();

        let orders = pairs(&out, "AMETHYSTS");
        let buys: Qty = orders.iter().filter(|(_, q)| *q > 0).map(|(_, q)| q).sum();
        let sells: Qty = orders.iter().filter(|(_, q)| *q < 0).map(|(_, q)| q).sum();
        assert!(orders.iter().all(|(_, q)| *q != 0));
        assert!(pos + buys <= 20, "pos {pos}: buys {buys}");
        assert!(pos + sells >= -20, "pos {pos}: sells {sells}");
        // tidak pernah beli di atas / jual di bawah fair value
        assert!(orders.iter().all(|(p, q)| if *q > 0 { *p <= 10_000 } else { *p >= 10_000 }));
    }
}

/// Reference basket: CHOCOLATE 8000, STRAWBERRIES 4000, ROSES 14000 -> synthetic + 375 = 70375.
fn basket_tick(basket_mid_shift: Price, basket_pos: Qty) -> TradingState {
    let mut st = TradingState { timestamp: 0, ..Default::default() };
    st.order_depths.insert("CHOCOLATE".into(), depth(&[(8001, -50)], &[(7999, 50)]));
    st.order_depths.insert("STRAWBERRIES".into(), depth(&[(4001, -50)], &[(3999, 50)]));
    st.order_depths.insert("ROSES".into(), depth(&[(14001, -50)], &[(13999, 50)]));
    let m = 70375 + basket_mid_shift;
    st.order_depths.insert(
        "GIFT_BASKET".into(),
        depth(&[(m + 1, -5), (m + 8, -3)], &[(m - 1, 4), (m - 10, 6)]),
    );
    st.position.insert("GIFT_BASKET".into(), basket_pos);
    st
}

#[test]
fn basket_rich_sells_full_capacity_then_resets_when_saturated() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();

    let out = t.run(&basket_tick(125, 0)).unwrap();
    assert_eq!(pairs(&out, "GIFT_BASKET"), vec![(70375 + 125 - 10, -60)]);
    assert!(pairs(&out, "CHOCOLATE").is_empty());
    let st = t.arbitrage_state("GIFT_BASKET").copied().unwrap();
    assert_eq!((st.pending_buy_unfilled, st.pending_sell_unfilled), (0, 2));

    // terisi penuh -> -60: counter sell direset, tidak ada order lagi
    let out = t.run(&basket_tick(125, -60)).unwrap();
    assert!(pairs(&out, "GIFT_BASKET").is_empty());
    let st = t.arbitrage_state("GIFT_BASKET").copied().unwrap();
    assert_eq!((st.pending_buy_unfilled, st.pending_sell_unfilled), (0, 0));
}

#[test]
fn basket_cheap_buys_and_neutral_keeps_counters() {
    let mut t = Trader::new(EngineConfig::reference()).unwrap();

    let out = t.run(&basket_tick(-125, 10)).unwrap();
    assert_eq!(pairs(&out, "GIFT_BASKET"), vec![(70375 - 125 + 8, 50)]);

    // spread 0: tidak trade, counter tetap (close_at tidak aktif)
    let out = t.run(&basket_tick(0, 10)).unwrap();
    assert!(pairs(&out, "GIFT_BASKET").is_empty());
    let st = t.arbitrage_state("GIFT_BASKET").copied().unwrap();
    assert_eq!((st.pending_buy_unfilled, st.pending_sell_unfilled), (2, 0));
}

#[test]
fn observation_features_feed_multi_input_regression() {
    let mut instruments = BTreeMap::new();
    instruments.insert(
        "FLOWER".to_string(),
        InstrumentConfig {
            limit: 50,
            predictor: Some(PredictorConfig::Regression {
                window: 2,
                features: vec![Feature::Mid("FLOWER".into()), Feature::Observation("FLOWER.sun".into())],
                // = newest mid + newest sun / 10
                coefficients: vec![0.0, 1.0, 0.0, 0.1],
                intercept: 0.0,
                half_width: 1,
            }),
            quoting: Some(QuoteStyle::MarketMake(MarketMakeParams::default())),
        },
    );
    let cfg = EngineConfig { instruments, baskets: Vec::new(), conversions: 1 };
    let mut t = Trader::new(cfg).unwrap();

    for (ts, sun) in [(0, 10.0), (1, 30.0)] {
        let mut st = TradingState { timestamp: ts, ..Default::default() };
        st.order_depths.insert("FLOWER".into(), depth(&[(1003, -5)], &[(997, 5)]));
        st.observations.insert("FLOWER.sun".into(), sun);
        t.run(&st).unwrap();
    }
    // 1000 + 3 = 1003
    assert_eq!(t.band("FLOWER"), FairValueBand::Bounded { lower: 1002, upper: 1004 });
}

#[test]
fn conversions_passthrough_is_configurable() {
    let mut cfg = EngineConfig::reference();
    cfg.conversions = 0;
    let mut t = Trader::new(cfg).unwrap();
    assert_eq!(t.run(&TradingState::default()).unwrap().conversions, 0);
}

fn pair_tick(ts: i64, a_mid: Price, b_mid: Option<Price>) -> TradingState {
    let mut st = TradingState { timestamp: ts, ..Default::default() };
    st.order_depths.insert("A".into(), depth(&[(a_mid + 1, -5)], &[(a_mid - 1, 5)]));
    if let Some(b) = b_mid {
        st.order_depths.insert("B".into(), depth(&[(b + 1, -5)], &[(b - 1, 5)]));
    }
    st
}

#[test]
fn missing_feature_keeps_multi_input_regression_cold_until_aligned() {
    let mut instruments = BTreeMap::new();
    instruments.insert(
        "A".to_string(),
        InstrumentConfig {
            limit: 20,
            predictor: Some(PredictorConfig::Regression {
                window: 2,
                features: vec![Feature::Mid("A".into()), Feature::Mid("B".into())],
                // = newest A + newest B / 10
                coefficients: vec![0.0, 1.0, 0.0, 0.1],
                intercept: 0.0,
                half_width: 1,
            }),
            quoting: None,
        },
    );
    let mut t = Trader::new(EngineConfig { instruments, baskets: Vec::new(), conversions: 1 }).unwrap();

    t.run(&pair_tick(0, 100, Some(200))).unwrap();
    t.run(&pair_tick(1, 110, None)).unwrap();
    t.run(&pair_tick(2, 120, Some(220))).unwrap();
    // A: tick 1,2  B: tick 0,2
    assert_eq!(t.history().get(&Feature::Mid("A".into())).unwrap().values(), vec![110.0, 120.0]);
    assert_eq!(t.history().get(&Feature::Mid("B".into())).unwrap().values(), vec![200.0, 220.0]);
    assert_eq!(t.band("A"), FairValueBand::Unbounded);

    t.run(&pair_tick(3, 130, Some(230))).unwrap();
    // 130 + 23
    assert_eq!(t.band("A"), FairValueBand::Bounded { lower: 152, upper: 154 });
}
