// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tracing::{info, warn};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Engine activity --------
pub static TICKS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ticks_total", "engine invocations").unwrap());

pub static ORDERS_BY: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "orders_total_by",
            "emitted orders by symbol & kind (kind: take, passive, skew, deviation, arb)",
        ),
        &["symbol", "kind"],
    )
    .unwrap()
});

pub static COLD_PREDICTOR: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("predictor_cold_total", "ticks where the predictor had too little history"),
        &["symbol"],
    )
    .unwrap()
});

pub static SKIPPED_BOOK: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("book_skipped_total", "ticks where a configured symbol had no usable book"),
        &["symbol"],
    )
    .unwrap()
});

// -------- State --------
pub static FAIR_VALUE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("fair_value_band", "fair value band edges (label bound: lower|upper)"),
        &["symbol", "bound"],
    )
    .unwrap()
});

pub static POSITION: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("position_qty", "signed position per symbol"), &["symbol"]).unwrap()
});

pub static BASKET_SPREAD: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("basket_spread", "basket minus weighted components minus fair offset"),
        &["basket"],
    )
    .unwrap()
});

pub static ARB_PENDING: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("arb_pending_unfilled", "hysteresis counters (label side: buy|sell)"),
        &["basket", "side"],
    )
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_LIMIT: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_position_limit", "configured position limit (label: symbol)"),
        &["symbol"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(TICKS.clone())),
        REGISTRY.register(Box::new(ORDERS_BY.clone())),
        REGISTRY.register(Box::new(COLD_PREDICTOR.clone())),
        REGISTRY.register(Box::new(SKIPPED_BOOK.clone())),
        REGISTRY.register(Box::new(FAIR_VALUE.clone())),
        REGISTRY.register(Box::new(POSITION.clone())),
        REGISTRY.register(Box::new(BASKET_SPREAD.clone())),
        REGISTRY.register(Box::new(ARB_PENDING.clone())),
        REGISTRY.register(Box::new(CONFIG_LIMIT.clone())),
    ] {
        if let Err(e) = m {
            warn!(?e, "metric registration failed");
        }
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics), tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

/// Bind and serve metrics from a dedicated OS thread; the tick loop stays single-threaded.
pub fn serve_metrics(port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)?;
    info!(%addr, "metrics listening");

    thread::spawn(move || {
        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => warn!(?e, "metrics accept error"),
            }
        }
    });
    Ok(())
}
