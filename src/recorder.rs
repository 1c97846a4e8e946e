// ===============================
// src/recorder.rs
// ===============================
//
// JSONL recorder sinkron, dipanggil langsung dari loop tick:
// - Tiap Event jadi satu baris JSON, distempel waktu wall-clock (chrono).
// - BufWriter supaya hemat syscall; flush tiap N event dan saat drop.
// - Parent directory dibuat otomatis.
// - Kalau tulis gagal, reopen file sekali lalu coba lagi.
//
// ENV: set `RECORD_FILE=/path/to/events.jsonl` agar aktif (lihat main.rs).
//
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::domain::Event;

const FLUSH_EVERY_N_EVENTS: u32 = 1000;

#[derive(Serialize)]
struct Stamped<'a> {
    at: String,
    event: &'a Event,
}

fn open_writer(path: &str) -> io::Result<BufWriter<File>> {
    // Pastikan parent directory ada (kalau ada)
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

pub struct Recorder {
    path: String,
    writer: BufWriter<File>,
    since_last_flush: u32,
}

impl Recorder {
    pub fn open(path: &str) -> io::Result<Self> {
        let writer = open_writer(path)?;
        info!(%path, "recorder: started");
        Ok(Self { path: path.to_string(), writer, since_last_flush: 0 })
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    /// Best effort: failures are logged and the event dropped, never fatal.
    pub fn record(&mut self, ev: &Event) {
        let stamped = Stamped { at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true), event: ev };
        let line = match serde_json::to_string(&stamped) {
            Ok(s) => s,
            Err(e) => {
                error!(?e, "recorder: serialize error, skip event");
                return;
            }
        };

        if let Err(e) = self.write_line(&line) {
            error!(?e, "recorder: write failed, attempting reopen");
            match open_writer(&self.path) {
                Ok(w) => {
                    self.writer = w;
                    // coba lagi sekali setelah reopen
                    if let Err(e2) = self.write_line(&line) {
                        error!(?e2, "recorder: write failed again after reopen, drop event");
                        return;
                    }
                }
                Err(e2) => {
                    error!(?e2, path = %self.path, "recorder: reopen failed, drop event");
                    return;
                }
            }
        }

        self.since_last_flush += 1;
        if self.since_last_flush >= FLUSH_EVERY_N_EVENTS {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            error!(?e, "recorder: flush failed");
        }
        self.since_last_flush = 0;
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TickOutput, TickSummary};

    #[test]
    fn writes_one_stamped_line_per_event() {
        let dir = std::env::temp_dir().join(format!("tick_trader_rec_{}", std::process::id()));
        let path = dir.join("events.jsonl");
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        {
            let mut rec = Recorder::open(&path_str).unwrap();
            rec.record(&Event::Tick(TickSummary { timestamp: 100, books: 2, positions: Default::default() }));
            rec.record(&Event::Out(TickOutput { timestamp: 100, ..Default::default() }));
            rec.record(&Event::Note("done".into()));
        }

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(first["at"].as_str().is_some_and(|s| s.ends_with('Z')));
        assert_eq!(first["event"]["Tick"]["timestamp"], 100);
        let last: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last["event"]["Note"], "done");

        let _ = fs::remove_dir_all(&dir);
    }
}
