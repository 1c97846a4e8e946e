// ===============================
// src/main.rs
// ===============================
/*
 # replay satu file state (satu TradingState JSON per baris)
 RUST_LOG=info cargo run --release -- --input ticks.jsonl --output orders.jsonl

 # lanjut dari state terakhir run sebelumnya
 cargo run --release -- --input ticks_part2.jsonl --resume orders.jsonl

 # metrics
 METRICS_PORT=9898 cargo run -- --input ticks.jsonl
 curl -s localhost:9898/metrics | grep '^orders_total_by'
 curl -s localhost:9898/metrics | grep '^basket_spread'
*/
/*
=============================================================================
Project : tick_trader_rust — per-tick order-generation engine in Rust
Module  : <module_name>.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Turns per-tick order books and inventory into limit orders:
          constant and regression fair-value bands, market-making with
          inventory skew, basket-vs-synthetic arbitrage with hysteresis,
          hard position-limit checks, Prometheus metrics, JSONL records.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tick_trader::config::{self, load_engine_config, ConfigError, EngineConfig};
use tick_trader::domain::{Event, TickSummary, TradingState};
use tick_trader::engine::{EngineError, Trader};
use tick_trader::metrics;
use tick_trader::recorder::Recorder;

/// Replay TradingState lines through the engine, one TickOutput line per tick.
#[derive(Parser, Debug)]
#[command(name = "tick_trader", version, about)]
struct Cli {
    /// JSONL input, one TradingState per line ("-" or absent = stdin)
    #[arg(long)]
    input: Option<String>,
    /// JSONL output ("-" or absent = stdout)
    #[arg(long)]
    output: Option<String>,
    /// EngineConfig JSON; absent = built-in reference preset
    #[arg(long)]
    config: Option<String>,
    /// Append JSONL event records here
    #[arg(long)]
    record: Option<String>,
    /// Previous output file; its last trader_data seeds the first tick
    #[arg(long)]
    resume: Option<String>,
    #[arg(long)]
    metrics_port: Option<u16>,
    #[arg(long)]
    conversions: Option<i64>,
    /// Print the effective EngineConfig as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("input line {line}: {source}")]
    Parse { line: usize, #[source] source: serde_json::Error },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// ENV dulu, flag CLI menimpa.
struct RunArgs {
    input: Option<String>,
    output: Option<String>,
    record: Option<String>,
    resume: Option<String>,
    metrics_port: Option<u16>,
}

fn main() {
    // ---- Logging ---- (stdout dipakai untuk output order)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::load();

    let cfg = match build_config(&cli, &settings) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "config rejected");
            std::process::exit(2);
        }
    };

    if cli.dump_config {
        match serde_json::to_string_pretty(&cfg) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                error!(%e, "config encode failed");
                std::process::exit(2);
            }
        }
        return;
    }

    let args = RunArgs {
        input: cli.input.or(settings.input_file),
        output: cli.output.or(settings.output_file),
        record: cli.record.or(settings.record_file),
        resume: cli.resume,
        metrics_port: cli.metrics_port.or(settings.metrics_port),
    };

    if let Err(e) = run(cfg, args) {
        error!(%e, "run aborted");
        std::process::exit(1);
    }
}

fn build_config(cli: &Cli, settings: &config::Settings) -> Result<EngineConfig, ConfigError> {
    let path = cli.config.as_deref().or(settings.engine_config.as_deref());
    let mut cfg = load_engine_config(path)?;
    if let Some(c) = cli.conversions.or(settings.conversions) {
        cfg.conversions = c;
    }
    Ok(cfg)
}

fn last_trader_data(path: &str) -> Result<String, DriverError> {
    let reader = BufReader::new(File::open(path)?);
    let mut last = None;
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            last = Some(line);
        }
    }
    let Some(line) = last else { return Ok(String::new()) };
    let v: serde_json::Value = serde_json::from_str(&line)?;
    Ok(v.get("trader_data").and_then(|d| d.as_str()).unwrap_or_default().to_string())
}

fn run(cfg: EngineConfig, args: RunArgs) -> Result<(), DriverError> {
    // ---- Metrics ----
    metrics::init();
    for (sym, inst) in &cfg.instruments {
        metrics::CONFIG_LIMIT.with_label_values(&[sym.as_str()]).set(inst.limit);
    }
    if let Some(port) = args.metrics_port {
        if let Err(e) = metrics::serve_metrics(port) {
            warn!(?e, port, "metrics exporter disabled");
        }
    }

    info!(
        instruments = ?cfg.instruments.keys().collect::<Vec<_>>(),
        baskets = ?cfg.baskets.iter().map(|b| b.basket.as_str()).collect::<Vec<_>>(),
        conversions = cfg.conversions,
        input = args.input.as_deref().unwrap_or("-"),
        output = args.output.as_deref().unwrap_or("-"),
        "startup config"
    );

    // ---- Recorder (optional) ----
    let mut rec = match args.record.as_deref() {
        Some(path) => Some(Recorder::open(path)?),
        None => None,
    };

    let reader: Box<dyn BufRead> = match args.input.as_deref() {
        Some(p) if p != "-" => Box::new(BufReader::new(File::open(p)?)),
        _ => Box::new(io::stdin().lock()),
    };
    let mut writer: BufWriter<Box<dyn Write>> = match args.output.as_deref() {
        Some(p) if p != "-" => BufWriter::new(Box::new(File::create(p)?)),
        _ => BufWriter::new(Box::new(io::stdout().lock())),
    };

    let mut last_data = match args.resume.as_deref() {
        Some(p) => last_trader_data(p)?,
        None => String::new(),
    };
    if let Some(r) = rec.as_mut() {
        r.record(&Event::Note(format!("run started, resumed={}", !last_data.is_empty())));
    }

    let mut trader = Trader::new(cfg)?;
    let mut ticks: u64 = 0;
    let mut orders: usize = 0;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut state: TradingState =
            serde_json::from_str(&line).map_err(|source| DriverError::Parse { line: n + 1, source })?;
        // harness tidak bawa trader_data -> driver yang round-trip
        if state.trader_data.is_empty() {
            state.trader_data = std::mem::take(&mut last_data);
        }

        let out = trader.run(&state)?;
        if let Some(r) = rec.as_mut() {
            r.record(&Event::Tick(TickSummary {
                timestamp: state.timestamp,
                books: state.order_depths.len(),
                positions: trader.inventory().snapshot(),
            }));
        }
        serde_json::to_writer(&mut writer, &out)?;
        writer.write_all(b"\n")?;

        ticks += 1;
        orders += out.order_count();
        last_data = out.trader_data.clone();
        if let Some(r) = rec.as_mut() {
            r.record(&Event::Out(out));
        }
        if ticks % 1000 == 0 {
            info!(ticks, orders, "heartbeat");
        }
    }

    writer.flush()?;
    info!(ticks, orders, engine_ticks = trader.ticks(), "run complete");
    Ok(())
}
