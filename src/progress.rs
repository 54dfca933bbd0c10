//! Extraction progress reporting.
//!
//! Reports observable progress while the aggregator walks the contact list
//! so long extractions don't look stalled. Progress is emitted on **stderr**
//! so stdout remains parseable for scripts. Not part of the aggregation
//! contract: reporters have no side effect beyond the log stream.

use std::io::Write;

/// A single progress event during extraction.
#[derive(Clone, Debug)]
pub enum ExtractProgressEvent {
    /// Contact enumeration finished; scanning begins.
    Listing { total: u64 },
    /// n contacts scanned out of total.
    Scanning { n: u64, total: u64 },
}

/// Reports extraction progress. Implementations write to stderr (human or JSON).
pub trait ExtractProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the aggregation loop.
    fn report(&self, event: ExtractProgressEvent);
}

/// Human-friendly progress on stderr: "extract  scanning  1,234 / 5,000 contacts".
pub struct StderrProgress;

impl ExtractProgressReporter for StderrProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let line = match &event {
            ExtractProgressEvent::Listing { total } => {
                format!("extract  {} contacts found\n", format_number(*total))
            }
            ExtractProgressEvent::Scanning { n, total } => {
                format!(
                    "extract  scanning  {} / {} contacts\n",
                    format_number(*n),
                    format_number(*total)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExtractProgressReporter for JsonProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let obj = match &event {
            ExtractProgressEvent::Listing { total } => serde_json::json!({
                "event": "progress",
                "phase": "listing",
                "total": total
            }),
            ExtractProgressEvent::Scanning { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExtractProgressReporter for NoProgress {
    fn report(&self, _event: ExtractProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to the aggregator.
    pub fn reporter(&self) -> Box<dyn ExtractProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
